use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Push notification sent to every connected page.
///
/// Most signals carry no payload; receivers re-fetch the document they care
/// about. The few that embed data do so for low-latency reveals.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    MatchdataUpdate,
    DraftdataUpdate,
    AnalyzerUpdate,
    AnalyzerControl {
        action: String,
    },
    MapdrawUpdate {
        data: Value,
    },
    MvpUpdate {
        data: Value,
    },
    ScheduleUpdate {
        data: Value,
    },
    NotificationTrigger {
        #[serde(rename = "videoId")]
        video_id: Value,
    },
}
