//! Run configuration for a sequencer.

use std::fmt;
use std::rc::Rc;

/// Completion callback, invoked once per finished run.
pub type EndCallback = Rc<dyn Fn()>;

/// Options controlling how a sequencer reacts to its own transitions.
///
/// A running sequencer starts on its own and reports completion. A passive
/// one stays in `Waiting`, ignores advances and never reports completion.
///
/// # Example
///
/// ```rust
/// use phaseline::shell::RunOptions;
///
/// let options = RunOptions::new().on_end(|| println!("done"));
/// assert!(options.is_running());
///
/// let passive = RunOptions::passive();
/// assert!(!passive.is_running());
/// ```
#[derive(Clone)]
pub struct RunOptions {
    pub(crate) running: bool,
    pub(crate) on_end: Option<EndCallback>,
}

impl RunOptions {
    /// Running options with no completion callback.
    pub fn new() -> Self {
        Self {
            running: true,
            on_end: None,
        }
    }

    /// Options for a sequencer that stays armed but never starts.
    pub fn passive() -> Self {
        Self::new().running(false)
    }

    /// Set whether the sequencer auto-starts and reports completion.
    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Set the completion callback.
    pub fn on_end<F>(mut self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.on_end = Some(Rc::new(callback));
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_on_end(&self) -> bool {
        self.on_end.is_some()
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("running", &self.running)
            .field("on_end", &self.on_end.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
