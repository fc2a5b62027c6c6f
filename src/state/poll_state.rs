/// Lifecycle states of a price polling loop
///
/// ```text
/// Idle -> Polling -> Stopped    (cancellation observed)
///                 -> Completed  (requested amount collected)
/// ```
use std::fmt;

/// Represents the current state of a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Created but not yet started
    Idle,

    /// Fetching, recording and waiting between ticks
    Polling,

    /// Cancellation was observed; collected prices are returned
    Stopped,

    /// The requested number of prices was collected
    Completed,
}

impl PollState {
    /// Returns true if the loop has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: PollState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Polling)
                | (Self::Polling, Self::Stopped)
                | (Self::Polling, Self::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
