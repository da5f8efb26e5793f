use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::dto::update_dto::Signal;

/// One frame on the push channel. `origin` is set for frames relayed from a
/// client so the sender does not get its own message back.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub origin: Option<u64>,
    pub text: Arc<str>,
}

/// Fan-out of change signals to every connected page.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Outbound>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Best effort: with nobody connected the signal is simply dropped.
    pub fn publish(&self, signal: &Signal) {
        let text = match serde_json::to_string(signal) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize update: {}", e);
                return;
            }
        };

        let delivered = self
            .tx
            .send(Outbound {
                origin: None,
                text: text.into(),
            })
            .unwrap_or(0);
        debug!("Published {} to {} subscriber(s).", signal_name(signal), delivered);
    }

    fn relay(&self, origin: u64, text: &str) {
        let _ = self.tx.send(Outbound {
            origin: Some(origin),
            text: text.into(),
        });
    }

    fn connection_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

fn signal_name(signal: &Signal) -> &'static str {
    match signal {
        Signal::MatchdataUpdate => "matchdata_update",
        Signal::DraftdataUpdate => "draftdata_update",
        Signal::AnalyzerUpdate => "analyzer_update",
        Signal::AnalyzerControl { .. } => "analyzer_control",
        Signal::MapdrawUpdate { .. } => "mapdraw_update",
        Signal::MvpUpdate { .. } => "mvp_update",
        Signal::ScheduleUpdate { .. } => "schedule_update",
        Signal::NotificationTrigger { .. } => "notification_trigger",
    }
}

/// Client frames of type `update` are passed on to every other client;
/// anything else is ignored.
fn is_relayable(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "update"))
        .unwrap_or(false)
}

pub async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let id = broadcaster.connection_id();
    let (mut sender, mut receiver) = socket.split();
    let mut rx = broadcaster.subscribe();
    info!("Display {} connected.", id);

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => {
                    if frame.origin == Some(id) {
                        continue;
                    }
                    if sender.send(Message::Text(frame.text.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                // missed signals are not replayed; the next one triggers a refetch
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Display {} lagged, skipped {} signal(s).", id, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) if is_relayable(text.as_str()) => broadcaster.relay(id, text.as_str()),
            Message::Text(_) => debug!("Ignoring message from display {}.", id),
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    info!("Display {} disconnected.", id);
}
