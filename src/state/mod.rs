//! State management module
//!
//! This module contains the shared cancellation signal observed by every
//! long-running loop and the lifecycle states of the price poller.

mod cancellation;
mod poll_state;

pub use cancellation::CancellationToken;
pub use poll_state::PollState;
