//! Trailing price window and simple moving average

/// Mean of the last `period` values, or `None` while fewer are available
///
/// # Example
///
/// ```
/// use coin_pulse::poller::simple_moving_average;
///
/// assert_eq!(simple_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3), Some(4.0));
/// assert_eq!(simple_moving_average(&[1.0, 2.0], 3), None);
/// ```
pub fn simple_moving_average(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Observed prices in arrival order
///
/// Storage grows without a cap; the average only reads the last `period` values.
#[derive(Debug, Clone)]
pub struct PollWindow {
    values: Vec<f64>,
    period: usize,
}

impl PollWindow {
    pub fn new(period: usize) -> Self {
        Self {
            values: Vec::new(),
            period,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Trailing average over `period` values
    pub fn average(&self) -> Option<f64> {
        simple_moving_average(&self.values, self.period)
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
