//! Core sequencer types and logic.
//!
//! This module contains the pure functional core of the sequencer:
//! - Machine states and the events that move between them
//! - The transition function and its length-bound `Reducer`
//! - Phase definitions and lookup
//! - Immutable transition logging
//!
//! Nothing in this module performs side effects.

mod event;
mod history;
mod reducer;
mod sequence;
mod state;

pub use event::Event;
pub use history::{RunId, TransitionLog, TransitionRecord};
pub use reducer::{transition, Reducer};
pub use sequence::{Phase, Sequence};
pub use state::MachineState;
