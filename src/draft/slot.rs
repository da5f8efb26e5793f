use serde::{Deserialize, Serialize};

use crate::draft::DraftError;

pub const SLOT_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Blue,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Ban,
    Pick,
}

/// Where a flat slot number lives inside the draft document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub side: Side,
    pub kind: SlotKind,
    pub index: usize,
}

/// Maps a slot number to its cell.
///
/// 0-4 blue picks, 5-9 red picks, 10-14 blue bans, 15-19 red bans. This is the
/// numbering the control panel's twenty inputs use (offset by one).
pub fn slot_ref(slot: usize) -> Result<SlotRef, DraftError> {
    let (side, kind) = match slot {
        0..=4 => (Side::Blue, SlotKind::Pick),
        5..=9 => (Side::Red, SlotKind::Pick),
        10..=14 => (Side::Blue, SlotKind::Ban),
        15..=19 => (Side::Red, SlotKind::Ban),
        _ => return Err(DraftError::InvalidSlot(slot)),
    };

    Ok(SlotRef {
        side,
        kind,
        index: slot % 5,
    })
}
