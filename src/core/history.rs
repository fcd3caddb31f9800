//! Transition log for the sequencer.
//!
//! Provides immutable tracking of committed transitions over time,
//! following functional programming principles.

use super::event::Event;
use super::state::MachineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::time::Duration;
use uuid::Uuid;

/// Identifier of one run, from the first phase through `Ended`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use phaseline::core::{Event, MachineState, RunId, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     run: RunId::new(),
///     from: MachineState::Waiting,
///     to: MachineState::Running { index: 0 },
///     event: Event::Start,
///     timestamp: Utc::now(),
/// };
/// assert!(!record.completes_run());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Run the transition belongs to
    pub run: RunId,
    /// The state being transitioned from
    pub from: MachineState,
    /// The state being transitioned to
    pub to: MachineState,
    /// The event that caused the transition
    pub event: Event,
    /// When the transition was committed
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Whether this transition entered `Ended` from a non-final state.
    pub fn completes_run(&self) -> bool {
        self.to.is_final() && !self.from.is_final()
    }
}

/// Ordered log of committed transitions.
///
/// The log is immutable: `record` returns a new log with the transition
/// appended.
///
/// # Example
///
/// ```rust
/// use phaseline::core::{Event, MachineState, RunId, TransitionLog, TransitionRecord};
/// use chrono::Utc;
///
/// let run = RunId::new();
/// let log = TransitionLog::new()
///     .record(TransitionRecord {
///         run,
///         from: MachineState::Waiting,
///         to: MachineState::Running { index: 0 },
///         event: Event::Start,
///         timestamp: Utc::now(),
///     })
///     .record(TransitionRecord {
///         run,
///         from: MachineState::Running { index: 0 },
///         to: MachineState::Ended,
///         event: Event::Advance,
///         timestamp: Utc::now(),
///     });
///
/// assert_eq!(log.get_path().len(), 3); // Waiting -> Running(0) -> Ended
/// assert_eq!(log.completed_runs(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionLog {
    transitions: Vec<TransitionRecord>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new log.
    pub fn record(&self, transition: TransitionRecord) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of states traversed.
    ///
    /// Returns the `from` state of the first transition followed by the
    /// `to` state of each transition.
    pub fn get_path(&self) -> Vec<&MachineState> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last recorded transition.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.last()
    }

    /// Number of transitions that entered `Ended`.
    pub fn completed_runs(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.completes_run())
            .count()
    }

    /// Transitions belonging to one run.
    pub fn for_run(&self, run: RunId) -> impl Iterator<Item = &TransitionRecord> + '_ {
        self.transitions.iter().filter(move |t| t.run == run)
    }
}
