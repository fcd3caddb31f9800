//! Phaseline: a pure functional phase sequencer
//!
//! Phaseline steps through an ordered list of phases one advance at a time
//! and reports completion exactly once when the list runs out. It backs UI
//! elements that show a series of transient states, such as animation steps
//! or onboarding screens.
//!
//! It follows a "pure core, imperative shell" split. The transition
//! function is a pure `(state, event) -> state` mapping, while the
//! shell owns the state and performs auto-start and completion callbacks.
//!
//! # Core Concepts
//!
//! - **MachineState**: `Waiting`, `Running { index }` or `Ended`
//! - **Event**: `Start`, `Advance` or `Rearm`
//! - **Sequence**: the immutable, ordered phase list for one run
//! - **Sequencer**: the reactive shell driving a machine
//!
//! # Example
//!
//! ```rust
//! use phaseline::{MachineState, RunOptions, Sequencer};
//!
//! let sequencer = Sequencer::new(vec!["a", "b", "c"], RunOptions::new());
//! let next = sequencer.advance_handle();
//!
//! assert_eq!(sequencer.phase(), Some("a"));
//! next.call();
//! next.call();
//! assert_eq!(sequencer.phase(), Some("c"));
//! next.call();
//! assert_eq!(sequencer.state(), MachineState::Ended);
//! ```

pub mod core;
pub mod error;
pub mod macros;
pub mod shell;

// Re-export commonly used types
pub use core::{Event, MachineState, Phase, Reducer, Sequence};
pub use error::SequenceError;
pub use shell::{AdvanceHandle, RunOptions, Sequencer};
