//! Pure transition function for the phase sequencer.
//!
//! The reducer maps `(state, event)` to the next state, or to an error
//! when the event is out of protocol order. It knows nothing about the
//! phase values themselves, only how many there are.

use super::event::Event;
use super::state::MachineState;
use crate::error::SequenceError;

/// Compute the state that follows `state` when `event` is applied to a
/// sequence of `len` phases.
///
/// | State          | Event     | Result                                |
/// |----------------|-----------|---------------------------------------|
/// | `Waiting`      | `Start`   | first phase                           |
/// | `Ended`        | `Rearm`   | `Waiting`                             |
/// | `Waiting`      | `Advance` | first phase                           |
/// | `Ended`        | `Advance` | first phase                           |
/// | `Running(i)`   | `Advance` | `Running(i + 1)` if `i + 1 < len`, otherwise `Ended` |
///
/// "First phase" is `Running(0)`, or `Ended` when `len == 0`. Every other
/// combination is an `InvalidTransition`.
///
/// # Example
///
/// ```rust
/// use phaseline::core::{transition, Event, MachineState};
///
/// let state = transition(&MachineState::Waiting, Event::Start, 2).unwrap();
/// assert_eq!(state, MachineState::Running { index: 0 });
///
/// let state = transition(&state, Event::Advance, 2).unwrap();
/// assert_eq!(state, MachineState::Running { index: 1 });
///
/// let state = transition(&state, Event::Advance, 2).unwrap();
/// assert_eq!(state, MachineState::Ended);
///
/// assert!(transition(&state, Event::Start, 2).is_err());
/// ```
pub fn transition(
    state: &MachineState,
    event: Event,
    len: usize,
) -> Result<MachineState, SequenceError> {
    match (event, state) {
        (Event::Start, MachineState::Waiting) => Ok(first_phase(len)),
        (Event::Rearm, MachineState::Ended) => Ok(MachineState::Waiting),
        (Event::Advance, MachineState::Running { index }) => {
            let next = index.saturating_add(1);
            if next < len {
                Ok(MachineState::Running { index: next })
            } else {
                Ok(MachineState::Ended)
            }
        }
        // No active index: treated as an implicit start.
        (Event::Advance, MachineState::Waiting | MachineState::Ended) => Ok(first_phase(len)),
        (Event::Start | Event::Rearm, _) => Err(SequenceError::InvalidTransition {
            event,
            state: *state,
        }),
    }
}

fn first_phase(len: usize) -> MachineState {
    if len == 0 {
        MachineState::Ended
    } else {
        MachineState::Running { index: 0 }
    }
}

/// Transition function closed over the length of one sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reducer {
    len: usize,
}

impl Reducer {
    pub fn new(len: usize) -> Self {
        Self { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// State a fresh machine starts in.
    ///
    /// A running machine begins on its first phase, or already `Ended` when
    /// there are no phases. A passive machine begins in `Waiting`.
    pub fn initial(&self, running: bool) -> MachineState {
        if running {
            first_phase(self.len)
        } else {
            MachineState::Waiting
        }
    }

    /// Apply one event (pure).
    pub fn apply(&self, state: &MachineState, event: Event) -> Result<MachineState, SequenceError> {
        transition(state, event, self.len)
    }

    /// Check whether `event` is accepted in `state` (pure).
    pub fn accepts(&self, state: &MachineState, event: Event) -> bool {
        self.apply(state, event).is_ok()
    }

    /// Fold a series of events over `state`, stopping at the first error.
    pub fn replay<I>(&self, state: MachineState, events: I) -> Result<MachineState, SequenceError>
    where
        I: IntoIterator<Item = Event>,
    {
        events
            .into_iter()
            .try_fold(state, |state, event| self.apply(&state, event))
    }
}
