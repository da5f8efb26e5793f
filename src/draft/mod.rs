//! Pick/ban state machine.
//!
//! [`DraftSession`] is the single authority over phase sequencing, slot gating
//! and the countdown. It is plain synchronous state: callers pass `now` in and
//! decide where the result is persisted, which keeps every transition testable
//! without a runtime.

pub mod phase;
pub mod slot;
pub mod timer;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use crate::dto::draft_dto::DraftDocument;
use phase::{DraftFormat, Phase, PhaseKind};
use slot::{Side, slot_ref};
use timer::{DEFAULT_PHASE_SECONDS, Timer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("slot {0} does not exist, slots are numbered 0-19")]
    InvalidSlot(usize),
    #[error("slot {slot} is not open during phase {phase}")]
    PhaseMismatch { slot: usize, phase: usize },
    #[error("phase {phase} is beyond the last phase ({terminal})")]
    InvalidPhase { phase: usize, terminal: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub advanced: bool,
}

/// Read-only description of the phase the draft is in.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PhaseView {
    pub index: usize,
    pub terminal: usize,
    pub completed: bool,
    pub kind: Option<PhaseKind>,
    pub side: Option<Side>,
    pub slots: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct DraftSession {
    format: DraftFormat,
    /* timer fields of `board` are stale; `timer` is authoritative and
     * projected back in by `document()` */
    board: DraftDocument,
    timer: Timer,
    correction: bool,
}

impl DraftSession {
    pub fn new(format: DraftFormat) -> Self {
        Self {
            format,
            board: DraftDocument::default(),
            timer: Timer::default(),
            correction: false,
        }
    }

    /// Resumes a stored document. A running countdown restarts from its stored
    /// value at `now`.
    pub fn from_document(
        format: DraftFormat,
        document: DraftDocument,
        now: Instant,
    ) -> Result<Self, DraftError> {
        let mut session = Self::new(format);
        session.replace(document, now)?;
        Ok(session)
    }

    pub fn format(&self) -> DraftFormat {
        self.format
    }

    pub fn current_phase(&self) -> usize {
        self.board.current_phase
    }

    pub fn is_completed(&self) -> bool {
        self.board.current_phase >= self.format.terminal()
    }

    pub fn active_phase(&self) -> Option<&'static Phase> {
        self.format.phase(self.board.current_phase)
    }

    pub fn correction_mode(&self) -> bool {
        self.correction
    }

    pub fn set_correction_mode(&mut self, enabled: bool) {
        self.correction = enabled;
    }

    pub fn timer(&self) -> Timer {
        self.timer
    }

    pub fn phase_view(&self) -> PhaseView {
        let phase = self.active_phase();
        PhaseView {
            index: self.board.current_phase,
            terminal: self.format.terminal(),
            completed: self.is_completed(),
            kind: phase.map(|p| p.kind),
            side: phase.and_then(|p| p.side),
            slots: phase.map(|p| p.slots.to_vec()).unwrap_or_default(),
        }
    }

    /// The document as displays should see it at `now`.
    pub fn document(&self, now: Instant) -> DraftDocument {
        let mut document = self.board.clone();
        document.timer = self.timer.remaining(now);
        document.timer_running = self.timer.is_running();
        document
    }

    pub fn hero(&self, slot: usize) -> Result<&str, DraftError> {
        Ok(self.board.slot(slot_ref(slot)?).hero.as_str())
    }

    pub fn is_active_slot(&self, slot: usize) -> bool {
        self.active_phase()
            .is_some_and(|phase| phase.slots.contains(&slot))
    }

    /// Writes `hero` into `slot`.
    ///
    /// Outside correction mode only the active phase's slots are writable, and
    /// filling the last of them advances the phase within the same call.
    pub fn apply_selection(
        &mut self,
        slot: usize,
        hero: &str,
        now: Instant,
    ) -> Result<SelectionOutcome, DraftError> {
        let cell = slot_ref(slot)?;

        if !self.correction && !self.is_active_slot(slot) {
            return Err(DraftError::PhaseMismatch {
                slot,
                phase: self.board.current_phase,
            });
        }

        self.board.slot_mut(cell).hero = hero.to_string();

        let advanced = !self.correction && self.check_phase_completion(now);
        Ok(SelectionOutcome { advanced })
    }

    /// Advances when every slot of the active phase holds a hero. Phases
    /// without slots never complete on their own.
    pub fn check_phase_completion(&mut self, now: Instant) -> bool {
        let Some(phase) = self.active_phase() else {
            return false;
        };
        if phase.slots.is_empty() {
            return false;
        }

        let filled = phase.slots.iter().all(|&slot| {
            slot_ref(slot)
                .map(|cell| !self.board.slot(cell).is_empty())
                .unwrap_or(false)
        });

        filled && self.advance_phase(now)
    }

    /// Moves to the next phase and restarts the countdown. Returns `false`
    /// without touching anything once the draft is complete.
    pub fn advance_phase(&mut self, now: Instant) -> bool {
        if self.is_completed() {
            return false;
        }
        self.board.current_phase += 1;
        self.timer = Timer::running(DEFAULT_PHASE_SECONDS, now);
        true
    }

    pub fn reset(&mut self) {
        self.board.current_phase = 0;
        self.board.clear_slots();
        self.timer = Timer::stopped(DEFAULT_PHASE_SECONDS);
        self.correction = false;
    }

    /// Exchanges two slots in any phase. Never completes a phase.
    pub fn swap_slots(&mut self, first: usize, second: usize) -> Result<(), DraftError> {
        let a = slot_ref(first)?;
        let b = slot_ref(second)?;
        if a == b {
            return Ok(());
        }

        let hero_a = std::mem::take(&mut self.board.slot_mut(a).hero);
        let hero_b = std::mem::replace(&mut self.board.slot_mut(b).hero, hero_a);
        self.board.slot_mut(a).hero = hero_b;
        Ok(())
    }

    pub fn start_timer(&mut self, now: Instant) {
        self.timer.start(now);
    }

    pub fn stop_timer(&mut self, now: Instant) {
        self.timer.stop(now);
    }

    /// Replaces the whole board with an operator-posted document.
    pub fn replace(&mut self, document: DraftDocument, now: Instant) -> Result<(), DraftError> {
        let terminal = self.format.terminal();
        if document.current_phase > terminal {
            return Err(DraftError::InvalidPhase {
                phase: document.current_phase,
                terminal,
            });
        }

        self.timer = if document.timer_running {
            Timer::running(document.timer, now)
        } else {
            Timer::stopped(document.timer)
        };
        self.board = document;
        Ok(())
    }
}
