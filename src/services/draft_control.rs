use serde::Serialize;
use tokio::{
    sync::{RwLock, RwLockWriteGuard},
    time::Instant,
};
use tracing::{info, warn};

use crate::draft::{DraftError, DraftSession, PhaseView, phase::DraftFormat};
use crate::dto::{
    draft_dto::{ControlAction, DraftDocument, DraftEnvelope, DraftMutationResult},
    update_dto::Signal,
};
use crate::error::AppError;
use crate::services::{
    store::{Domain, DocumentStore},
    websocket::Broadcaster,
};

/// Status snapshot for the control panel.
#[derive(Debug, Serialize)]
pub struct DraftStatus {
    pub draftdata: DraftDocument,
    pub phase: PhaseView,
    pub correction_mode: bool,
    pub format: DraftFormat,
}

/// Owns the live draft. Every mutation runs under the write lock from
/// validation to persistence, so readers never see a half-applied transition
/// and the stored document always matches memory.
pub struct DraftController {
    session: RwLock<DraftSession>,
    store: DocumentStore,
    broadcaster: Broadcaster,
}

impl DraftController {
    /// Resumes the stored draft, falling back to a fresh one if the stored
    /// document does not fit `format`.
    pub async fn load(
        format: DraftFormat,
        store: DocumentStore,
        broadcaster: Broadcaster,
    ) -> Result<Self, AppError> {
        let stored: DraftEnvelope = store.get_or_default(Domain::Draft).await?;
        let session = match DraftSession::from_document(format, stored.draftdata, Instant::now()) {
            Ok(session) => session,
            Err(e) => {
                warn!("Stored draft is unusable ({}), starting fresh.", e);
                DraftSession::new(format)
            }
        };
        info!(
            "Draft loaded at phase {} of {}.",
            session.current_phase(),
            format.terminal()
        );

        Ok(Self {
            session: RwLock::new(session),
            store,
            broadcaster,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub async fn snapshot(&self) -> DraftEnvelope {
        let session = self.session.read().await;
        DraftEnvelope {
            draftdata: session.document(Instant::now()),
        }
    }

    pub async fn status(&self) -> DraftStatus {
        let session = self.session.read().await;
        DraftStatus {
            draftdata: session.document(Instant::now()),
            phase: session.phase_view(),
            correction_mode: session.correction_mode(),
            format: session.format(),
        }
    }

    /// Persists `next` and only then installs it. A failed write leaves
    /// memory untouched.
    async fn commit(
        &self,
        session: &mut DraftSession,
        next: DraftSession,
        now: Instant,
    ) -> Result<(), AppError> {
        let envelope = DraftEnvelope {
            draftdata: next.document(now),
        };
        self.store.set_as(Domain::Draft, &envelope).await?;
        *session = next;
        Ok(())
    }

    /// Runs `mutate` on a copy of the session and commits the result.
    async fn mutate<T, F>(&self, mutate: F) -> Result<(T, DraftMutationResult), AppError>
    where
        F: FnOnce(&mut DraftSession, Instant) -> Result<(T, String), DraftError>,
    {
        let now = Instant::now();
        let mut session = self.session.write().await;

        let mut next = session.clone();
        let (value, message) = mutate(&mut next, now)?;
        self.commit(&mut session, next, now).await?;

        let result = DraftMutationResult {
            message,
            current_phase: session.current_phase(),
            advanced: false,
            correction_mode: session.correction_mode(),
        };
        drop(session);

        self.broadcaster.publish(&Signal::DraftdataUpdate);
        Ok((value, result))
    }

    pub async fn select(&self, slot: usize, hero: &str) -> Result<DraftMutationResult, AppError> {
        let (advanced, mut result) = self
            .mutate(|session, now| {
                let outcome = session.apply_selection(slot, hero, now)?;
                Ok((outcome.advanced, format!("Slot {slot} set to '{hero}'.")))
            })
            .await?;
        result.advanced = advanced;
        info!("{} (phase {})", result.message, result.current_phase);
        Ok(result)
    }

    pub async fn swap(&self, first: usize, second: usize) -> Result<DraftMutationResult, AppError> {
        let ((), result) = self
            .mutate(|session, _| {
                session.swap_slots(first, second)?;
                Ok(((), format!("Swapped slots {first} and {second}.")))
            })
            .await?;
        Ok(result)
    }

    pub async fn control(&self, action: ControlAction) -> Result<DraftMutationResult, AppError> {
        let (advanced, mut result) = self
            .mutate(|session, now| {
                let outcome = match action {
                    ControlAction::Start => {
                        session.start_timer(now);
                        (false, "Timer started.".to_string())
                    }
                    ControlAction::Stop => {
                        session.stop_timer(now);
                        (false, "Timer stopped.".to_string())
                    }
                    ControlAction::NextPhase => {
                        let advanced = session.advance_phase(now);
                        let message = if advanced {
                            format!("Advanced to phase {}.", session.current_phase())
                        } else {
                            "Draft is already complete.".to_string()
                        };
                        (advanced, message)
                    }
                    ControlAction::Reset => {
                        session.reset();
                        (false, "Draft reset.".to_string())
                    }
                };
                Ok(outcome)
            })
            .await?;
        result.advanced = advanced;
        info!("{}", result.message);
        Ok(result)
    }

    pub async fn set_correction_mode(&self, enabled: bool) -> Result<DraftMutationResult, AppError> {
        let ((), result) = self
            .mutate(|session, _| {
                session.set_correction_mode(enabled);
                let state = if enabled { "enabled" } else { "disabled" };
                Ok(((), format!("Correction mode {state}.")))
            })
            .await?;
        Ok(result)
    }

    /// Replaces the whole board with an operator-posted document.
    pub async fn replace(&self, document: DraftDocument) -> Result<DraftMutationResult, AppError> {
        let ((), result) = self
            .mutate(|session, now| {
                session.replace(document, now)?;
                Ok(((), "Draft data updated.".to_string()))
            })
            .await?;
        Ok(result)
    }

    pub async fn reset(&self) -> Result<DraftMutationResult, AppError> {
        self.control(ControlAction::Reset).await
    }

    /// Locks the draft for an archive. No other mutation lands until the
    /// returned section is finished or dropped.
    pub async fn begin_archive(&self) -> ArchiveSection<'_> {
        ArchiveSection {
            controller: self,
            session: self.session.write().await,
            taken_at: Instant::now(),
        }
    }
}

/// Exclusive hold on the draft between taking an archive snapshot and the
/// optional reset, so the reset only clears what was archived.
pub struct ArchiveSection<'a> {
    controller: &'a DraftController,
    session: RwLockWriteGuard<'a, DraftSession>,
    taken_at: Instant,
}

impl ArchiveSection<'_> {
    pub fn snapshot(&self) -> DraftEnvelope {
        DraftEnvelope {
            draftdata: self.session.document(self.taken_at),
        }
    }

    pub async fn reset(mut self) -> Result<(), AppError> {
        let mut next = self.session.clone();
        next.reset();
        self.controller
            .commit(&mut self.session, next, Instant::now())
            .await?;
        drop(self.session);

        info!("Draft reset after archive.");
        self.controller.broadcaster.publish(&Signal::DraftdataUpdate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    async fn controller() -> DraftController {
        let store = DocumentStore::connect("sqlite::memory:").await.expect("db");
        DraftController::load(DraftFormat::Standard, store, Broadcaster::new(16))
            .await
            .expect("controller")
    }

    #[tokio::test]
    async fn selection_persists_and_signals() {
        let controller = controller().await;
        let mut rx = controller.broadcaster().subscribe();

        let result = controller.select(10, "fanny").await.unwrap();
        assert!(result.advanced);
        assert_eq!(result.current_phase, 1);

        let stored: DraftEnvelope = controller.store().get_or_default(Domain::Draft).await.unwrap();
        assert_eq!(stored.draftdata.blueside.ban[0].hero, "fanny");
        assert_eq!(stored.draftdata.current_phase, 1);
        assert!(stored.draftdata.timer_running);

        let frame = rx.recv().await.unwrap();
        assert_eq!(&*frame.text, r#"{"type":"draftdata_update"}"#);
    }

    #[tokio::test]
    async fn rejected_selection_changes_nothing() {
        let controller = controller().await;
        let mut rx = controller.broadcaster().subscribe();

        let err = controller.select(0, "ling").await.unwrap_err();
        assert!(matches!(err, AppError::Draft(DraftError::PhaseMismatch { slot: 0, phase: 0 })));
        assert_eq!(controller.snapshot().await, DraftEnvelope::default());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn display_that_missed_signals_refetches_current_state() {
        let controller = controller().await;

        controller.select(10, "fanny").await.unwrap();
        controller.select(15, "ling").await.unwrap();
        // a display subscribing now saw none of the above
        let mut late = controller.broadcaster().subscribe();
        controller.select(11, "tigreal").await.unwrap();

        assert!(late.recv().await.is_ok());
        let fetched = controller.snapshot().await.draftdata;
        assert_eq!(fetched.current_phase, 3);
        assert_eq!(fetched.blueside.ban[0].hero, "fanny");
        assert_eq!(fetched.redside.ban[0].hero, "ling");
        assert_eq!(fetched.blueside.ban[1].hero, "tigreal");
    }

    #[tokio::test]
    async fn correction_mode_writes_anywhere_without_advancing() {
        let controller = controller().await;
        controller.set_correction_mode(true).await.unwrap();

        let result = controller.select(9, "chou").await.unwrap();
        assert!(!result.advanced);
        assert!(result.correction_mode);
        assert_eq!(result.current_phase, 0);
        assert_eq!(controller.snapshot().await.draftdata.redside.pick[4].hero, "chou");
    }

    #[tokio::test]
    async fn reset_clears_board_and_correction_mode() {
        let controller = controller().await;
        controller.select(10, "fanny").await.unwrap();
        controller.set_correction_mode(true).await.unwrap();

        let result = controller.reset().await.unwrap();
        assert!(!result.correction_mode);
        assert_eq!(controller.snapshot().await, DraftEnvelope::default());
    }

    #[tokio::test]
    async fn replacing_with_a_phase_past_the_end_is_rejected() {
        let controller = controller().await;
        let document = DraftDocument {
            current_phase: 19,
            ..DraftDocument::default()
        };

        let err = controller.replace(document).await.unwrap_err();
        assert!(matches!(err, AppError::Draft(DraftError::InvalidPhase { phase: 19, terminal: 18 })));
    }

    #[tokio::test]
    async fn reload_resumes_the_stored_draft() {
        let store = DocumentStore::connect("sqlite::memory:").await.expect("db");
        let first = DraftController::load(DraftFormat::Standard, store.clone(), Broadcaster::new(4))
            .await
            .unwrap();
        first.select(10, "fanny").await.unwrap();
        first.control(ControlAction::Stop).await.unwrap();

        let second = DraftController::load(DraftFormat::Standard, store, Broadcaster::new(4))
            .await
            .unwrap();
        let resumed = second.snapshot().await.draftdata;
        assert_eq!(resumed.current_phase, 1);
        assert!(!resumed.timer_running);
        assert_eq!(resumed.blueside.ban[0].hero, "fanny");
    }
}
