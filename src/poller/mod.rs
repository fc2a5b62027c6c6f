//! Live price poller
//!
//! Repeatedly fetches a single-value price endpoint, keeps every observed
//! price, and reports a trailing simple moving average. The loop ends when
//! the requested number of prices is collected or the cancellation token is
//! set, whichever comes first; either way the prices collected so far are
//! returned.

mod price;
mod window;

pub use price::{PriceSource, PriceTick};
pub use window::{simple_moving_average, PollWindow};

use crate::config::PollerConfig;
use crate::fetch::ResilientFetcher;
use crate::state::{CancellationToken, PollState};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Loop parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between iterations
    pub interval: Duration,
    /// Stop after this many prices
    pub amount: usize,
    /// Trailing window for the average
    pub sma_period: usize,
}

impl PollSettings {
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            amount: config.amount,
            sma_period: config.sma_period,
        }
    }
}

/// Emitted once per successful tick
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub observed_at: DateTime<Utc>,
    pub price: f64,
    /// `None` until `sma_period` prices have been observed
    pub average: Option<f64>,
}

/// Polls a price endpoint through the resilient fetcher
#[derive(Debug, Clone)]
pub struct PricePoller {
    fetcher: ResilientFetcher,
    source: PriceSource,
    cancel: CancellationToken,
}

impl PricePoller {
    pub fn new(fetcher: ResilientFetcher, source: PriceSource, cancel: CancellationToken) -> Self {
        Self {
            fetcher,
            source,
            cancel,
        }
    }

    /// Runs the polling loop and returns every observed price in order
    ///
    /// `on_observation` is called after each successful tick. Failed ticks
    /// are absorbed: nothing is recorded and polling continues.
    pub async fn poll<F>(&self, settings: PollSettings, mut on_observation: F) -> Vec<f64>
    where
        F: FnMut(&PriceObservation),
    {
        let mut state = PollState::Idle;
        let mut window = PollWindow::new(settings.sma_period);

        transition(&mut state, PollState::Polling);

        loop {
            if window.len() >= settings.amount {
                transition(&mut state, PollState::Completed);
                break;
            }

            if let Some(tick) = self.fetch_tick().await {
                window.push(tick.price);
                let observation = PriceObservation {
                    observed_at: tick.observed_at,
                    price: tick.price,
                    average: window.average(),
                };
                on_observation(&observation);
            }

            if self.cancel.is_cancelled() {
                transition(&mut state, PollState::Stopped);
                break;
            }

            if window.len() >= settings.amount {
                transition(&mut state, PollState::Completed);
                break;
            }

            if !self.cancel.sleep(settings.interval).await {
                transition(&mut state, PollState::Stopped);
                break;
            }
        }

        if window.is_empty() && settings.amount > 0 {
            tracing::warn!("Price polling {} without a single price", state);
        } else {
            tracing::info!(
                "Price polling {} after {} of {} prices",
                state,
                window.len(),
                settings.amount
            );
        }

        window.into_values()
    }

    async fn fetch_tick(&self) -> Option<PriceTick> {
        let request = match self.source.request() {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Cannot build price request: {}", e);
                return None;
            }
        };

        let response = self
            .fetcher
            .fetch(&request, &self.cancel, None)
            .await
            .into_response()?;

        match self.source.decode(&response.body) {
            Ok(Some(tick)) => Some(tick),
            Ok(None) => {
                tracing::warn!("Price response held no usable {} price", self.source.coin_id);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to decode price response: {}", e);
                None
            }
        }
    }
}

fn transition(state: &mut PollState, next: PollState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid poll transition {} -> {}",
        state,
        next
    );
    tracing::debug!("Poller {} -> {}", state, next);
    *state = next;
}
