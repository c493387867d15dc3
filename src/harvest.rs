//! Breakeven price of a gathered base resource
//!
//! A worker walks to a source, works it with a tool and comes back with a
//! handful of units. The unit price covers their time, their upkeep and the
//! wear on the tool, scaled by how scarce the resource is.

use std::fmt;

use crate::models::GlobalRates;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestScenario {
    /// Seconds spent walking to the source.
    pub walking_time: f64,
    /// Seconds spent harvesting.
    pub action_time: f64,
    pub tool_worth: f64,
    /// Uses before the tool breaks.
    pub tool_uses: f64,
    /// Units gathered per action.
    pub harvested: f64,
    pub scarcity: f64,
}

impl Default for HarvestScenario {
    fn default() -> Self {
        Self {
            walking_time: 45.0,
            action_time: 10.0,
            tool_worth: 50.0,
            tool_uses: 150.0,
            harvested: 3.0,
            scarcity: 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestBreakdown {
    pub labor_rate: f64,
    pub sustenance_rate: f64,
    pub tool_cost_per_use: f64,
    pub total_time: f64,
    pub cost_per_action: f64,
    pub unit_price: f64,
}

impl HarvestScenario {
    pub fn price(&self, rates: &GlobalRates) -> HarvestBreakdown {
        let labor_rate = rates.labor_rate();
        let tool_cost_per_use = if self.tool_uses == 0.0 {
            0.0
        } else {
            self.tool_worth / self.tool_uses
        };
        let total_time = self.walking_time + self.action_time;
        let time_cost = total_time * (labor_rate + rates.sustenance_rate);
        let cost_per_action = (time_cost + tool_cost_per_use) * self.scarcity;
        let unit_price = if self.harvested == 0.0 {
            0.0
        } else {
            cost_per_action / self.harvested
        };

        HarvestBreakdown {
            labor_rate,
            sustenance_rate: rates.sustenance_rate,
            tool_cost_per_use,
            total_time,
            cost_per_action,
            unit_price,
        }
    }
}

impl fmt::Display for HarvestBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Harvest Breakdown ===")?;
        writeln!(f, "  Labor rate:       {:.4} SC/s", self.labor_rate)?;
        writeln!(f, "  Sustenance rate:  {:.4} SC/s", self.sustenance_rate)?;
        writeln!(f, "  Tool cost/use:    {:.4} SC", self.tool_cost_per_use)?;
        writeln!(f, "  Time per action:  {:.1} s", self.total_time)?;
        writeln!(f, "  Cost per action:  {:.4} SC", self.cost_per_action)?;
        writeln!(f)?;
        writeln!(f, "Breakeven price per unit: {:.4} SC", self.unit_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cherry_scenario() {
        let breakdown = HarvestScenario::default().price(&GlobalRates::default());
        // 55s * (1/6 + 0.0125) + 50/150, times 1.2, over 3 cherries
        let expected_action = (55.0 * (600.0 / 3600.0 + 0.0125) + 50.0 / 150.0) * 1.2;
        assert!((breakdown.cost_per_action - expected_action).abs() < 1e-9);
        assert!((breakdown.unit_price - expected_action / 3.0).abs() < 1e-9);
        assert_eq!(breakdown.total_time, 55.0);
    }

    #[test]
    fn zero_harvest_and_unbreakable_tool_are_guarded() {
        let scenario = HarvestScenario {
            tool_uses: 0.0,
            harvested: 0.0,
            ..HarvestScenario::default()
        };
        let breakdown = scenario.price(&GlobalRates::default());
        assert_eq!(breakdown.tool_cost_per_use, 0.0);
        assert_eq!(breakdown.unit_price, 0.0);
    }
}
