//! Sequencer error types.

use crate::core::{Event, MachineState};
use thiserror::Error;

/// Errors raised by the transition function and the phase lookup.
///
/// Both variants are logic errors. Nothing here is transient, so callers
/// should surface them rather than retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    /// An event was applied to a state that does not permit it.
    #[error("Sequence state is `{state}`, which does not accept the `{event}` event")]
    InvalidTransition { event: Event, state: MachineState },

    /// The active index points past the end of the phase list.
    #[error("Active index {index} is out of range for a sequence of {len} phases")]
    IndexOutOfRange { index: usize, len: usize },
}
