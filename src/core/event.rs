//! Events that drive the sequencer.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One of the three events the transition function accepts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Event {
    /// Leave `Waiting` and enter the first phase.
    Start,
    /// Move to the next phase, or end the sequence.
    Advance,
    /// Leave `Ended` and arm the machine again.
    Rearm,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Advance => "Advance",
            Self::Rearm => "Rearm",
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
