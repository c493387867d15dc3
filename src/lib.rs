//! SeedCoin production cost calculator
//!
//! Prices crafted items from their recipes: ingredient prices, worker time,
//! worker upkeep and machine wear. Computed prices are written back to the
//! material registry and are not refreshed until the recipe is evaluated
//! again.

pub mod calculator;
pub mod catalogue;
pub mod db;
pub mod error;
pub mod graph;
pub mod harvest;
pub mod machines;
pub mod models;
pub mod rates;
pub mod registry;
pub mod resolver;
pub mod session;

pub use calculator::{CostBreakdown, CostEngine, CostWarning, Evaluation, Multipliers, PriceReport};
pub use catalogue::Catalogue;
pub use error::{EconomyError, EconomyResult};
pub use graph::RecipeGraph;
pub use machines::MachineCostModel;
pub use models::{Category, GlobalRates, Ingredient, Machine, MachineField, MachineId, Material, Recipe};
pub use registry::MaterialRegistry;
pub use resolver::DependencyResolver;
pub use session::{Session, SessionSnapshot, SharedSession};
