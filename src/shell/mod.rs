//! Reactive shell around the pure sequencer core.
//!
//! The shell owns the current machine state and performs the two side
//! effects the core never does:
//!
//! - **Auto-start**: a running machine found in `Waiting` is started at once
//! - **Completion**: entering `Ended` while running calls `on_end` once per run
//!
//! Effects run only after a transition has been committed, never while the
//! transition is being computed.

mod options;
mod sequencer;

pub use options::{EndCallback, RunOptions};
pub use sequencer::{AdvanceHandle, Sequencer};
