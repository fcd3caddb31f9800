//! Machine state for the phase sequencer.
//!
//! `MachineState` is a plain value; every method on it is pure.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Position of a sequencer within its phase list.
///
/// # Example
///
/// ```rust
/// use phaseline::core::MachineState;
///
/// let state = MachineState::Running { index: 1 };
/// assert_eq!(state.name(), "Running");
/// assert!(!state.is_final());
/// assert!(MachineState::Ended.is_final());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MachineState {
    /// Armed but not started. No active index.
    Waiting,
    /// Showing the phase at `index`.
    Running { index: usize },
    /// Sequence exhausted. No active index.
    Ended,
}

impl MachineState {
    /// Get the state's name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "Waiting",
            Self::Running { .. } => "Running",
            Self::Ended => "Ended",
        }
    }

    /// Check if this is the terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Active index, if the machine is running.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Running { index } => Some(*index),
            Self::Waiting | Self::Ended => None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Whether the active index, if any, lies within `len` phases.
    pub fn is_within(&self, len: usize) -> bool {
        self.index().is_none_or(|index| index < len)
    }
}

impl Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { index } => write!(f, "Running({index})"),
            other => f.write_str(other.name()),
        }
    }
}
