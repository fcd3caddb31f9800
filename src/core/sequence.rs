//! Ordered phase definitions and phase lookup.

use super::reducer::Reducer;
use super::state::MachineState;
use crate::error::SequenceError;
use std::fmt::Debug;
use std::ops::Index;
use std::rc::Rc;

/// Marker for values usable as phase labels.
///
/// Phases are opaque to the machine: only their position matters.
/// Any cloneable, comparable, debuggable type qualifies.
pub trait Phase: Clone + PartialEq + Debug {}

impl<T: Clone + PartialEq + Debug> Phase for T {}

/// Immutable, ordered list of phases for one run.
///
/// Cloning a `Sequence` shares the underlying storage. Two sequences are
/// the same definition only when [`Sequence::same_definition`] holds.
///
/// # Example
///
/// ```rust
/// use phaseline::core::{MachineState, Sequence};
///
/// let sequence = Sequence::from(vec!["fade-in", "hold", "fade-out"]);
/// assert_eq!(sequence.len(), 3);
///
/// let phase = sequence.phase_for(&MachineState::Running { index: 1 }).unwrap();
/// assert_eq!(phase, Some(&"hold"));
///
/// assert_eq!(sequence.phase_for(&MachineState::Ended).unwrap(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Sequence<P: Phase> {
    phases: Rc<[P]>,
}

impl<P: Phase> Sequence<P> {
    pub fn new<I>(phases: I) -> Self
    where
        I: IntoIterator<Item = P>,
    {
        Self {
            phases: phases.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phases(&self) -> &[P] {
        &self.phases
    }

    pub fn get(&self, index: usize) -> Option<&P> {
        self.phases.get(index)
    }

    /// Transition function closed over this sequence's length.
    pub fn reducer(&self) -> Reducer {
        Reducer::new(self.len())
    }

    /// Whether `other` shares this sequence's storage.
    pub fn same_definition(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.phases, &other.phases)
    }

    /// Resolve the visible phase for `state`.
    ///
    /// `Waiting` and `Ended` have no visible phase. A running index outside
    /// the list is an internal invariant violation and is reported as
    /// `IndexOutOfRange` instead of returning a wrong phase.
    pub fn phase_for(&self, state: &MachineState) -> Result<Option<&P>, SequenceError> {
        match state.index() {
            None => Ok(None),
            Some(index) => self
                .get(index)
                .map(Some)
                .ok_or(SequenceError::IndexOutOfRange {
                    index,
                    len: self.len(),
                }),
        }
    }
}

impl<P: Phase> From<Vec<P>> for Sequence<P> {
    fn from(phases: Vec<P>) -> Self {
        Self {
            phases: phases.into(),
        }
    }
}

impl<P: Phase> From<&[P]> for Sequence<P> {
    fn from(phases: &[P]) -> Self {
        Self {
            phases: phases.into(),
        }
    }
}

impl<P: Phase, const N: usize> From<[P; N]> for Sequence<P> {
    fn from(phases: [P; N]) -> Self {
        Self::new(phases)
    }
}

impl<P: Phase> FromIterator<P> for Sequence<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<P: Phase> Index<usize> for Sequence<P> {
    type Output = P;

    fn index(&self, index: usize) -> &P {
        &self.phases[index]
    }
}
