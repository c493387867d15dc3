//! Economy rates derived from worker upkeep

use serde::Deserialize;

use crate::models::GlobalRates;

pub const DEFAULT_HOURLY_INCOME: f64 = 600.0;

/// Upkeep of a worker expressed through a staple food.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Sustenance {
    /// SeedCoin price of one loaf of bread.
    pub bread_price: f64,
    /// Food need points restored by one loaf.
    pub food_restored: f64,
    /// Food need points lost per second.
    pub decay_rate: f64,
}

impl Default for Sustenance {
    fn default() -> Self {
        Self {
            bread_price: 5.0,
            food_restored: 20.0,
            decay_rate: 0.05,
        }
    }
}

impl Sustenance {
    /// SeedCoin per second spent keeping the worker fed.
    pub fn rate(&self) -> f64 {
        if self.food_restored == 0.0 {
            return 0.0;
        }
        let cost_per_point = self.bread_price / self.food_restored;
        self.decay_rate * cost_per_point
    }
}

impl GlobalRates {
    pub fn from_sustenance(hourly_income: f64, sustenance: &Sustenance) -> Self {
        Self::new(hourly_income, sustenance.rate())
    }
}

impl Default for GlobalRates {
    fn default() -> Self {
        Self::from_sustenance(DEFAULT_HOURLY_INCOME, &Sustenance::default())
    }
}
