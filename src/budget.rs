//! Per-side isochrone time budget
//!
//! Each party is asked to travel a share of the A to B travel time plus a
//! fixed buffer, so the two reachable areas are likely to overlap even with
//! asymmetric routing. Both numbers are policy, loaded from [`BudgetConfig`].

use serde::{Deserialize, Serialize};

use crate::config::BudgetConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBudgetPolicy {
    pub travel_fraction: f64,
    pub buffer_seconds: u64,
}

impl Default for TimeBudgetPolicy {
    fn default() -> Self {
        Self::from(&BudgetConfig::default())
    }
}

impl From<&BudgetConfig> for TimeBudgetPolicy {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            travel_fraction: config.travel_fraction,
            buffer_seconds: config.buffer_seconds,
        }
    }
}

impl TimeBudgetPolicy {
    /// `ceil(travel_time_seconds * travel_fraction) + buffer_seconds`
    #[must_use]
    pub fn time_budget_seconds(&self, travel_time_seconds: u64) -> u64 {
        let share = (travel_time_seconds as f64 * self.travel_fraction).ceil() as u64;
        share.saturating_add(self.buffer_seconds)
    }
}
