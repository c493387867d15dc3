//! Data models for materials, recipes and machines

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Seconds in an hour, used to turn hourly income into a per-second labor rate.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Raw,
    Processed,
    Product,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Processed => "processed",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "processed" => Ok(Self::Processed),
            "product" => Ok(Self::Product),
            other => Err(format!("unknown category '{}' (expected raw, processed or product)", other)),
        }
    }
}

/// A priced material. `price == 0.0` means "not set yet".
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: Category,
    /// Set when `price` was last written by the cost engine. The value is the
    /// last computed price only; nothing tracks whether its inputs changed since.
    pub calculated: bool,
}

impl Material {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: 0.0,
            category,
            calculated: false,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.price > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub material_id: String,
    pub quantity: f64,
}

impl Ingredient {
    pub fn new(material_id: impl Into<String>, quantity: f64) -> Self {
        Self {
            material_id: material_id.into(),
            quantity,
        }
    }
}

/// Index of a machine record inside the `MachineCostModel` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(pub usize);

/// A recipe, keyed by the id of the material it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub manual_time: f64,
    pub auto_time: f64,
    /// Resolved once at catalogue load; `None` for hand-only recipes.
    pub machine: Option<MachineId>,
    pub skill_name: String,
    /// Batch yield. Zero is a degenerate recipe.
    pub amount: f64,
    pub stored_on: Option<String>,
    pub crafted_by: Option<String>,
}

impl Recipe {
    pub fn new(id: impl Into<String>, name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ingredients: Vec::new(),
            manual_time: 0.0,
            auto_time: 0.0,
            machine: None,
            skill_name: String::new(),
            amount,
            stored_on: None,
            crafted_by: None,
        }
    }

    pub fn with_ingredient(mut self, material_id: impl Into<String>, quantity: f64) -> Self {
        self.ingredients.push(Ingredient::new(material_id, quantity));
        self
    }

    pub fn with_times(mut self, manual_time: f64, auto_time: f64) -> Self {
        self.manual_time = manual_time;
        self.auto_time = auto_time;
        self
    }

    pub fn with_machine(mut self, machine: MachineId) -> Self {
        self.machine = Some(machine);
        self
    }

    pub fn with_skill(mut self, skill_name: impl Into<String>) -> Self {
        self.skill_name = skill_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub name: String,
    pub worth: f64,
    pub total_uses: f64,
}

impl Machine {
    pub fn new(name: impl Into<String>, worth: f64, total_uses: f64) -> Self {
        Self {
            name: name.into(),
            worth,
            total_uses,
        }
    }

    pub fn cost_per_use(&self) -> f64 {
        if self.total_uses > 0.0 {
            self.worth / self.total_uses
        } else {
            0.0
        }
    }
}

/// Editable machine field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineField {
    Worth,
    TotalUses,
}

impl MachineField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Worth => "worth",
            Self::TotalUses => "total_uses",
        }
    }
}

/// Economy-wide rates that anchor labor and upkeep costs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalRates {
    /// SeedCoin earned per hour of work.
    pub hourly_income: f64,
    /// SeedCoin per second to keep a worker fed.
    pub sustenance_rate: f64,
}

impl GlobalRates {
    pub fn new(hourly_income: f64, sustenance_rate: f64) -> Self {
        Self {
            hourly_income,
            sustenance_rate,
        }
    }

    pub fn labor_rate(&self) -> f64 {
        self.hourly_income / SECONDS_PER_HOUR
    }
}
