use serde::{Deserialize, Serialize};

use crate::draft::slot::{Side, SlotKind, SlotRef};
use crate::draft::timer::DEFAULT_PHASE_SECONDS;
use crate::dto::lenient;

pub const SIDE_SLOTS: usize = 5;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    #[serde(default)]
    pub hero: String,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.hero.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DraftSide {
    #[serde(default)]
    pub ban: [Slot; SIDE_SLOTS],
    #[serde(default)]
    pub pick: [Slot; SIDE_SLOTS],
}

impl DraftSide {
    pub fn slots(&self, kind: SlotKind) -> &[Slot; SIDE_SLOTS] {
        match kind {
            SlotKind::Ban => &self.ban,
            SlotKind::Pick => &self.pick,
        }
    }

    pub fn slots_mut(&mut self, kind: SlotKind) -> &mut [Slot; SIDE_SLOTS] {
        match kind {
            SlotKind::Ban => &mut self.ban,
            SlotKind::Pick => &mut self.pick,
        }
    }
}

/// The live pick/ban board as the overlay pages read it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DraftDocument {
    #[serde(default = "default_timer", deserialize_with = "lenient::number")]
    pub timer: u32,
    #[serde(default)]
    pub timer_running: bool,
    #[serde(default, deserialize_with = "lenient::number")]
    pub current_phase: usize,
    #[serde(default)]
    pub blueside: DraftSide,
    #[serde(default)]
    pub redside: DraftSide,
}

fn default_timer() -> u32 {
    DEFAULT_PHASE_SECONDS
}

impl Default for DraftDocument {
    fn default() -> Self {
        Self {
            timer: DEFAULT_PHASE_SECONDS,
            timer_running: false,
            current_phase: 0,
            blueside: DraftSide::default(),
            redside: DraftSide::default(),
        }
    }
}

impl DraftDocument {
    pub fn side(&self, side: Side) -> &DraftSide {
        match side {
            Side::Blue => &self.blueside,
            Side::Red => &self.redside,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut DraftSide {
        match side {
            Side::Blue => &mut self.blueside,
            Side::Red => &mut self.redside,
        }
    }

    pub fn slot(&self, at: SlotRef) -> &Slot {
        &self.side(at.side).slots(at.kind)[at.index]
    }

    pub fn slot_mut(&mut self, at: SlotRef) -> &mut Slot {
        &mut self.side_mut(at.side).slots_mut(at.kind)[at.index]
    }

    pub fn clear_slots(&mut self) {
        self.blueside = DraftSide::default();
        self.redside = DraftSide::default();
    }
}

/// `{"draftdata": {...}}`, the envelope every page posts and fetches.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DraftEnvelope {
    #[serde(default)]
    pub draftdata: DraftDocument,
}

#[derive(Debug, Deserialize)]
pub struct SelectHero {
    pub slot: usize,
    pub hero: String,
}

#[derive(Debug, Deserialize)]
pub struct SwapSlots {
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ControlAction {
    Start,
    Stop,
    NextPhase,
    Reset,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub action: ControlAction,
}

#[derive(Debug, Deserialize)]
pub struct ToggleCorrection {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DraftMutationResult {
    pub message: String,
    pub current_phase: usize,
    pub advanced: bool,
    pub correction_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_document_with_string_timer_and_empty_slots_parses() {
        let raw = r#"{
            "draftdata": {
                "timer": "60",
                "timer_running": false,
                "current_phase": 0,
                "blueside": { "ban": [{}, {}, {}, {}, {}], "pick": [{}, {}, {}, {}, {}] },
                "redside": { "ban": [{}, {}, {}, {}, {}], "pick": [{}, {}, {}, {}, {}] }
            }
        }"#;

        let envelope: DraftEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope, DraftEnvelope::default());
    }

    #[test]
    fn side_with_wrong_slot_count_is_rejected() {
        let raw = r#"{"draftdata": {"blueside": {"ban": [{}, {}], "pick": []}}}"#;
        assert!(serde_json::from_str::<DraftEnvelope>(raw).is_err());
    }

    #[test]
    fn serializes_timer_as_number() {
        let value = serde_json::to_value(DraftEnvelope::default()).unwrap();
        assert_eq!(value["draftdata"]["timer"], 60);
        assert_eq!(value["draftdata"]["redside"]["pick"][4]["hero"], "");
    }

    #[test]
    fn control_actions_use_panel_names() {
        let action: ControlAction = serde_json::from_str(r#""nextPhase""#).unwrap();
        assert_eq!(action, ControlAction::NextPhase);
    }
}
