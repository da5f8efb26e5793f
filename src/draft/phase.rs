use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::draft::slot::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Ban,
    Pick,
    /// Closing step with no writable slot; only swaps and corrections happen here.
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub kind: PhaseKind,
    pub side: Option<Side>,
    pub slots: &'static [usize],
}

const fn ban(side: Side, slots: &'static [usize]) -> Phase {
    Phase {
        kind: PhaseKind::Ban,
        side: Some(side),
        slots,
    }
}

const fn pick(side: Side, slots: &'static [usize]) -> Phase {
    Phase {
        kind: PhaseKind::Pick,
        side: Some(side),
        slots,
    }
}

const ADJUSTMENT: Phase = Phase {
    kind: PhaseKind::Adjustment,
    side: None,
    slots: &[],
};

use crate::draft::slot::Side::{Blue, Red};

/// Ten bans, three ban rounds interleaved with two pick rounds.
static STANDARD: [Phase; 18] = [
    ban(Blue, &[10]),
    ban(Red, &[15]),
    ban(Blue, &[11]),
    ban(Red, &[16]),
    ban(Blue, &[12]),
    ban(Red, &[17]),
    pick(Blue, &[0]),
    pick(Red, &[5, 6]),
    pick(Blue, &[1, 2]),
    pick(Red, &[7]),
    ban(Red, &[18]),
    ban(Blue, &[13]),
    ban(Red, &[19]),
    ban(Blue, &[14]),
    pick(Red, &[8]),
    pick(Blue, &[3, 4]),
    pick(Red, &[9]),
    ADJUSTMENT,
];

/// Six bans; the last ban of each side stays empty.
static SIX_BAN: [Phase; 14] = [
    ban(Blue, &[10]),
    ban(Red, &[15]),
    ban(Blue, &[11]),
    ban(Red, &[16]),
    pick(Blue, &[0]),
    pick(Red, &[5, 6]),
    pick(Blue, &[1, 2]),
    pick(Red, &[7]),
    ban(Red, &[17]),
    ban(Blue, &[12]),
    pick(Red, &[8]),
    pick(Blue, &[3, 4]),
    pick(Red, &[9]),
    ADJUSTMENT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftFormat {
    /// The 18-step order the overlay pages display, all ten bans used, with
    /// double picks at phases 7, 8 and 15.
    #[default]
    Standard,
    /// The control panel's six-ban order, 14 steps with double picks at
    /// phases 5, 6 and 11. The panel numbers slots from 1, so its
    /// "phase 5: slots 6 and 7" is slots 5 and 6 here.
    SixBan,
}

impl DraftFormat {
    pub fn phases(self) -> &'static [Phase] {
        match self {
            DraftFormat::Standard => &STANDARD,
            DraftFormat::SixBan => &SIX_BAN,
        }
    }

    /// Phase index meaning "all phases completed".
    pub fn terminal(self) -> usize {
        self.phases().len()
    }

    pub fn phase(self, index: usize) -> Option<&'static Phase> {
        self.phases().get(index)
    }
}

impl FromStr for DraftFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(DraftFormat::Standard),
            "six_ban" | "ban6" => Ok(DraftFormat::SixBan),
            other => Err(format!("unknown draft format '{other}'")),
        }
    }
}
