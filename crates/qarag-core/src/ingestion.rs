//! Ingestion progress state machine.
//!
//! The backend only reports when an upload request finishes, so the client
//! shows intermediate stages on fixed timers instead of real progress:
//!
//! ```text
//!   Idle ──begin──▶ Uploading ──t1──▶ Parsing ──t2──▶ Embedding
//!                       │                │                │
//!                       └──── upload ok ─┴────────────────┴──▶ Complete ──hold──▶ Idle
//!
//!   any active phase ──upload failed──▶ Idle
//! ```
//!
//! The tracker itself owns no timers. It hands out a [`CycleToken`] per
//! ingestion and only accepts transitions carrying the current token, so a
//! timer that fires late (after its cycle failed, completed, or was replaced)
//! is a no-op. Within a cycle the phase never moves backwards.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Displayed ingestion phase. The numeric value is the progress step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IngestionPhase {
    #[default]
    Idle = 0,
    Uploading = 1,
    Parsing = 2,
    Embedding = 3,
    Complete = 4,
}

impl IngestionPhase {
    /// The three stages shown as steps in the progress widget.
    pub const STAGES: [IngestionPhase; 3] = [
        IngestionPhase::Uploading,
        IngestionPhase::Parsing,
        IngestionPhase::Embedding,
    ];

    pub fn step(self) -> u8 {
        self as u8
    }

    /// Progress bar fill, `step / 4` as a percentage.
    pub fn fill_percent(self) -> f64 {
        f64::from(self.step()) / 4.0 * 100.0
    }

    /// Label used for a stage step in the progress widget.
    pub fn label(self) -> &'static str {
        match self {
            IngestionPhase::Idle => "Idle",
            IngestionPhase::Uploading => "Upload Stream",
            IngestionPhase::Parsing => "Neural Parsing",
            IngestionPhase::Embedding => "Vector Mapping",
            IngestionPhase::Complete => "Complete",
        }
    }

    /// How `stage` should be drawn while the tracker is in `self`.
    pub fn step_state(self, stage: IngestionPhase) -> StepState {
        if self == stage {
            StepState::Active
        } else if self > stage {
            StepState::Done
        } else {
            StepState::Pending
        }
    }
}

impl fmt::Display for IngestionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionPhase::Idle => "idle",
            IngestionPhase::Uploading => "uploading",
            IngestionPhase::Parsing => "parsing",
            IngestionPhase::Embedding => "embedding",
            IngestionPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Active,
    Done,
}

/// Identifies one ingestion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleToken(u64);

impl CycleToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Returned by [`IngestionTracker::begin`] while a cycle is still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an upload is already in progress ({phase})")]
pub struct IngestionBusy {
    pub phase: IngestionPhase,
}

/// Display delays for the timer-driven transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionTimings {
    /// Uploading → Parsing, measured from the start of the cycle.
    pub parsing_after: Duration,
    /// Parsing → Embedding, also measured from the start of the cycle.
    pub embedding_after: Duration,
    /// How long Complete stays on screen before returning to Idle.
    pub complete_hold: Duration,
}

impl Default for IngestionTimings {
    fn default() -> Self {
        Self {
            parsing_after: Duration::from_secs(2),
            embedding_after: Duration::from_secs(5),
            complete_hold: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestionTracker {
    phase: IngestionPhase,
    current: Option<u64>,
    next_cycle: u64,
}

impl IngestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> IngestionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != IngestionPhase::Idle
    }

    pub fn current_cycle(&self) -> Option<CycleToken> {
        self.current.map(CycleToken)
    }

    /// Start a cycle in [`IngestionPhase::Uploading`].
    ///
    /// Rejected while any cycle is active, including during the Complete hold.
    pub fn begin(&mut self) -> Result<CycleToken, IngestionBusy> {
        if self.is_active() {
            return Err(IngestionBusy { phase: self.phase });
        }
        let id = self.next_cycle;
        self.next_cycle += 1;
        self.current = Some(id);
        self.phase = IngestionPhase::Uploading;
        Ok(CycleToken(id))
    }

    /// Timer-driven move to Parsing or Embedding.
    ///
    /// Returns the new phase, or `None` if the token is stale, the target is
    /// not a timer stage, or the tracker is already at or past the target.
    pub fn advance(
        &mut self,
        token: CycleToken,
        target: IngestionPhase,
    ) -> Option<IngestionPhase> {
        if !self.owns(token) {
            return None;
        }
        if !matches!(target, IngestionPhase::Parsing | IngestionPhase::Embedding) {
            return None;
        }
        if target <= self.phase {
            return None;
        }
        self.phase = target;
        Some(target)
    }

    /// The upload request succeeded.
    pub fn complete(&mut self, token: CycleToken) -> Option<IngestionPhase> {
        if !self.owns(token) || self.phase == IngestionPhase::Complete {
            return None;
        }
        self.phase = IngestionPhase::Complete;
        Some(IngestionPhase::Complete)
    }

    /// The upload request failed: back to Idle immediately.
    pub fn fail(&mut self, token: CycleToken) -> Option<IngestionPhase> {
        if !self.owns(token) {
            return None;
        }
        self.reset();
        Some(IngestionPhase::Idle)
    }

    /// The Complete display hold elapsed.
    pub fn finish(&mut self, token: CycleToken) -> Option<IngestionPhase> {
        if !self.owns(token) || self.phase != IngestionPhase::Complete {
            return None;
        }
        self.reset();
        Some(IngestionPhase::Idle)
    }

    fn owns(&self, token: CycleToken) -> bool {
        self.current == Some(token.0) && self.is_active()
    }

    fn reset(&mut self) {
        self.phase = IngestionPhase::Idle;
        self.current = None;
    }
}
