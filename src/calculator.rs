//! Production cost calculation
//!
//! ```text
//! labor_rate     = hourly_income / 3600
//! materials_cost = sum(price * quantity) over ingredients
//! action_cost    = auto_time * (labor_rate + sustenance_rate) + machine cost per use
//! batch_cost     = (materials_cost + action_cost) * skill * complexity
//! unit_price     = batch_cost / amount            (0 when amount is 0)
//! ```
//!
//! `evaluate` writes the unit price back as the price of the recipe's output
//! material. Nothing else is recomputed: recipes consuming that material keep
//! their last written price until they are evaluated again.

use std::fmt;

use tracing::{debug, warn};

use crate::error::EconomyResult;
use crate::graph::RecipeGraph;
use crate::machines::MachineCostModel;
use crate::models::{Category, GlobalRates, Material};
use crate::registry::MaterialRegistry;
use crate::resolver::DependencyResolver;

/// Caller-supplied cost multipliers, both 1.0 by default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Multipliers {
    pub skill: f64,
    pub complexity: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            skill: 1.0,
            complexity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostBreakdown {
    pub labor_rate: f64,
    pub materials_cost: f64,
    pub machine_cost: f64,
    pub action_cost: f64,
    pub batch_cost: f64,
    pub unit_price: f64,
}

/// Data problems that do not stop an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum CostWarning {
    /// Ingredient id absent from the registry; priced as 0.
    MissingIngredientMaterial(String),
    /// Recipe yields nothing; unit price forced to 0.
    DegenerateRecipe { recipe_id: String },
}

impl fmt::Display for CostWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIngredientMaterial(id) => {
                write!(f, "ingredient '{}' is not a known material, priced as 0", id)
            }
            Self::DegenerateRecipe { recipe_id } => {
                write!(f, "recipe '{}' has amount 0, unit price set to 0", recipe_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub recipe_id: String,
    pub breakdown: CostBreakdown,
    pub warnings: Vec<CostWarning>,
}

impl Evaluation {
    pub fn unit_price(&self) -> f64 {
        self.breakdown.unit_price
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Reads recipes and machines, reads and writes prices.
///
/// The registries are handed in by the caller so the engine holds no state of
/// its own between calls.
pub struct CostEngine<'a> {
    graph: &'a RecipeGraph,
    machines: &'a MachineCostModel,
}

impl<'a> CostEngine<'a> {
    pub fn new(graph: &'a RecipeGraph, machines: &'a MachineCostModel) -> Self {
        Self { graph, machines }
    }

    /// Compute a recipe's cost without touching the registry.
    ///
    /// A recipe that can reach a loop is refused, even though only its direct
    /// ingredients are priced.
    pub fn preview(
        &self,
        registry: &MaterialRegistry,
        recipe_id: &str,
        rates: &GlobalRates,
        multipliers: Multipliers,
    ) -> EconomyResult<Evaluation> {
        let recipe = self.graph.find(recipe_id)?;
        DependencyResolver::new(self.graph).required_materials(recipe_id)?;
        let mut warnings = Vec::new();

        let mut materials_cost = 0.0;
        for ingredient in &recipe.ingredients {
            match registry.get(&ingredient.material_id) {
                Ok(material) => materials_cost += material.price * ingredient.quantity,
                Err(_) => {
                    warn!(
                        recipe = %recipe.id,
                        material = %ingredient.material_id,
                        "ingredient references unknown material"
                    );
                    warnings.push(CostWarning::MissingIngredientMaterial(
                        ingredient.material_id.clone(),
                    ));
                }
            }
        }

        let machine_cost = match recipe.machine {
            Some(id) => self.machines.cost_per_use(id)?,
            None => 0.0,
        };

        let labor_rate = rates.labor_rate();
        let action_cost = recipe.auto_time * (labor_rate + rates.sustenance_rate) + machine_cost;
        let batch_cost =
            (materials_cost + action_cost) * multipliers.skill * multipliers.complexity;

        let unit_price = if recipe.amount > 0.0 {
            batch_cost / recipe.amount
        } else {
            warn!(recipe = %recipe.id, "recipe has no yield");
            warnings.push(CostWarning::DegenerateRecipe {
                recipe_id: recipe.id.clone(),
            });
            0.0
        };

        Ok(Evaluation {
            recipe_id: recipe.id.clone(),
            breakdown: CostBreakdown {
                labor_rate,
                materials_cost,
                machine_cost,
                action_cost,
                batch_cost,
                unit_price,
            },
            warnings,
        })
    }

    /// Compute a recipe's cost and store the unit price on its output material.
    pub fn evaluate(
        &self,
        registry: &mut MaterialRegistry,
        recipe_id: &str,
        rates: &GlobalRates,
        multipliers: Multipliers,
    ) -> EconomyResult<Evaluation> {
        let evaluation = self.preview(registry, recipe_id, rates, multipliers)?;
        if !registry.contains(&evaluation.recipe_id) {
            let recipe = self.graph.find(recipe_id)?;
            registry.insert(Material::new(&recipe.id, &recipe.name, Category::Product));
        }
        registry.record_calculated(&evaluation.recipe_id, evaluation.unit_price())?;
        debug!(
            recipe = %evaluation.recipe_id,
            unit_price = evaluation.unit_price(),
            "recipe evaluated"
        );
        Ok(evaluation)
    }

    /// Evaluate every sub-recipe in dependency order, then the recipe itself.
    ///
    /// Fails before writing anything if the recipe is unknown or sits on a loop.
    pub fn evaluate_chain(
        &self,
        registry: &mut MaterialRegistry,
        recipe_id: &str,
        rates: &GlobalRates,
        multipliers: Multipliers,
    ) -> EconomyResult<Vec<Evaluation>> {
        let order = DependencyResolver::new(self.graph).evaluation_order(recipe_id)?;
        order
            .iter()
            .map(|id| self.evaluate(registry, id, rates, multipliers))
            .collect()
    }
}

/// Format an evaluation as a readable breakdown
pub fn format_evaluation(evaluation: &Evaluation, registry: &MaterialRegistry) -> String {
    let mut output = String::new();
    let name = registry
        .get(&evaluation.recipe_id)
        .map_or(evaluation.recipe_id.as_str(), |m| m.name.as_str());
    let b = &evaluation.breakdown;

    output.push_str(&format!("=== {} ===\n", name));
    output.push_str(&format!("  Labor rate:      {:>12.4} SC/s\n", b.labor_rate));
    output.push_str(&format!("  Materials cost:  {:>12.4} SC\n", b.materials_cost));
    output.push_str(&format!("  Machine cost:    {:>12.4} SC\n", b.machine_cost));
    output.push_str(&format!("  Action cost:     {:>12.4} SC\n", b.action_cost));
    output.push_str(&format!("  Batch cost:      {:>12.4} SC\n", b.batch_cost));
    output.push_str(&format!("  Unit price:      {:>12.4} SC\n", b.unit_price));
    for warning in &evaluation.warnings {
        output.push_str(&format!("  warning: {}\n", warning));
    }
    output
}

/// Current prices in registry order, ready for display or export
#[derive(Debug)]
pub struct PriceReport {
    pub rows: Vec<PriceRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub calculated: bool,
}

impl PriceReport {
    pub fn from_registry(registry: &MaterialRegistry, category: Option<Category>) -> Self {
        let rows = registry
            .list(category)
            .into_iter()
            .map(|m| PriceRow {
                id: m.id.clone(),
                name: m.name.clone(),
                category: m.category,
                price: m.price,
                calculated: m.calculated,
            })
            .collect();
        Self { rows }
    }
}

impl fmt::Display for PriceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<24} {:<30} {:<10} {:>12}", "Id", "Name", "Category", "Price (SC)")?;
        writeln!(f, "{}", "-".repeat(79))?;
        for row in &self.rows {
            let price = if row.price > 0.0 {
                format!("{:.4}", row.price)
            } else {
                "unset".to_string()
            };
            let mark = if row.calculated { "*" } else { "" };
            writeln!(
                f,
                "{:<24} {:<30} {:<10} {:>12}{}",
                row.id, row.name, row.category, price, mark
            )?;
        }
        if self.rows.iter().any(|r| r.calculated) {
            writeln!(f)?;
            writeln!(f, "* last calculated price")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EconomyError;
    use crate::models::{Machine, Recipe};

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    struct Fixture {
        registry: MaterialRegistry,
        graph: RecipeGraph,
        machines: MachineCostModel,
    }

    fn fixture() -> Fixture {
        let mut machines = MachineCostModel::new();
        let press = machines.define(Machine::new("Press", 1000.0, 100.0)).unwrap();

        let graph = RecipeGraph::new(vec![
            Recipe::new("juice", "Juice", 1.0)
                .with_ingredient("cherry", 2.0)
                .with_ingredient("sugar", 2.0)
                .with_times(30.0, 10.0)
                .with_machine(press)
                .with_skill("Cooking"),
            Recipe::new("jam", "Jam", 4.0)
                .with_ingredient("juice", 2.0)
                .with_times(60.0, 20.0),
            Recipe::new("mystery", "Mystery", 1.0).with_ingredient("unobtainium", 3.0),
            Recipe::new("nothing", "Nothing", 0.0).with_ingredient("cherry", 1.0),
        ])
        .unwrap();

        let mut registry = MaterialRegistry::new();
        registry.insert(Material::new("cherry", "Cherry", Category::Raw));
        registry.insert(Material::new("sugar", "Sugar", Category::Processed));
        for recipe in graph.recipes() {
            registry.insert(Material::new(&recipe.id, &recipe.name, Category::Product));
        }
        registry.set_price("cherry", 0.5).unwrap();
        registry.set_price("sugar", 0.5).unwrap();

        Fixture {
            registry,
            graph,
            machines,
        }
    }

    fn rates() -> GlobalRates {
        GlobalRates::new(600.0, 0.001)
    }

    #[test]
    fn formula_matches_reference_numbers() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let eval = engine
            .evaluate(&mut fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let b = eval.breakdown;

        assert!(approx(b.labor_rate, 600.0 / 3600.0, EPS));
        assert!(approx(b.materials_cost, 2.0, EPS));
        assert!(approx(b.machine_cost, 10.0, EPS));
        assert!(approx(b.action_cost, 11.6767, 1e-4));
        assert!(approx(b.batch_cost, 13.6767, 1e-4));
        assert!(approx(b.unit_price, 13.6767, 1e-4));
        assert!(eval.is_clean());
    }

    #[test]
    fn evaluate_writes_unit_price_and_marks_calculated() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let eval = engine
            .evaluate(&mut fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let juice = fx.registry.get("juice").unwrap();
        assert_eq!(juice.price, eval.unit_price());
        assert!(juice.calculated);
    }

    #[test]
    fn preview_leaves_registry_untouched() {
        let fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        engine
            .preview(&fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        assert_eq!(fx.registry.get("juice").unwrap().price, 0.0);
    }

    #[test]
    fn unit_price_is_batch_cost_over_amount() {
        let mut fx = fixture();
        fx.registry.set_price("juice", 3.3).unwrap();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let eval = engine
            .evaluate(&mut fx.registry, "jam", &rates(), Multipliers::default())
            .unwrap();
        assert_eq!(eval.breakdown.unit_price, eval.breakdown.batch_cost / 4.0);
    }

    #[test]
    fn multipliers_scale_batch_cost() {
        let fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let plain = engine
            .preview(&fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let scaled = engine
            .preview(
                &fx.registry,
                "juice",
                &rates(),
                Multipliers {
                    skill: 1.1,
                    complexity: 2.0,
                },
            )
            .unwrap();
        assert!(approx(
            scaled.breakdown.batch_cost,
            plain.breakdown.batch_cost * 1.1 * 2.0,
            EPS
        ));
        assert_eq!(scaled.breakdown.action_cost, plain.breakdown.action_cost);
    }

    #[test]
    fn sustenance_shift_moves_action_cost_linearly() {
        let fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let delta = 0.25;
        let base = engine
            .preview(&fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let shifted = engine
            .preview(
                &fx.registry,
                "juice",
                &GlobalRates::new(600.0, 0.001 + delta),
                Multipliers::default(),
            )
            .unwrap();
        assert!(approx(
            shifted.breakdown.action_cost - base.breakdown.action_cost,
            10.0 * delta,
            EPS
        ));
    }

    #[test]
    fn missing_ingredient_is_priced_zero_with_warning() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let eval = engine
            .evaluate(&mut fx.registry, "mystery", &rates(), Multipliers::default())
            .unwrap();
        assert_eq!(eval.breakdown.materials_cost, 0.0);
        assert_eq!(
            eval.warnings,
            vec![CostWarning::MissingIngredientMaterial("unobtainium".to_string())]
        );
    }

    #[test]
    fn zero_amount_yields_zero_price_with_warning() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let eval = engine
            .evaluate(&mut fx.registry, "nothing", &rates(), Multipliers::default())
            .unwrap();
        assert_eq!(eval.unit_price(), 0.0);
        assert!(eval.breakdown.batch_cost > 0.0);
        assert_eq!(
            eval.warnings,
            vec![CostWarning::DegenerateRecipe {
                recipe_id: "nothing".to_string()
            }]
        );
    }

    #[test]
    fn evaluating_does_not_cascade_to_consumers() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        engine
            .evaluate(&mut fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let jam = engine
            .evaluate(&mut fx.registry, "jam", &rates(), Multipliers::default())
            .unwrap();

        // Re-pricing juice must leave jam at its last written value.
        fx.registry.set_price("cherry", 5.0).unwrap();
        engine
            .evaluate(&mut fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        assert_eq!(fx.registry.get("jam").unwrap().price, jam.unit_price());

        let fresh = engine
            .evaluate(&mut fx.registry, "jam", &rates(), Multipliers::default())
            .unwrap();
        assert!(fresh.unit_price() > jam.unit_price());
    }

    #[test]
    fn chain_evaluation_prices_sub_recipes_first() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        let evals = engine
            .evaluate_chain(&mut fx.registry, "jam", &rates(), Multipliers::default())
            .unwrap();
        let ids: Vec<_> = evals.iter().map(|e| e.recipe_id.as_str()).collect();
        assert_eq!(ids, ["juice", "jam"]);

        let juice = fx.registry.get("juice").unwrap().price;
        let jam = &evals[1].breakdown;
        assert!(approx(jam.materials_cost, juice * 2.0, EPS));
    }

    #[test]
    fn unknown_recipe_leaves_registry_untouched() {
        let mut fx = fixture();
        let before = PriceReport::from_registry(&fx.registry, None).rows;
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        assert!(engine
            .evaluate(&mut fx.registry, "pie", &rates(), Multipliers::default())
            .is_err());
        assert_eq!(PriceReport::from_registry(&fx.registry, None).rows, before);
    }

    #[test]
    fn recipe_reaching_a_loop_is_refused_without_writing() {
        // press_cake needs pulp, pulp needs press_cake; tart only consumes pulp.
        let graph = RecipeGraph::new(vec![
            Recipe::new("pulp", "Pulp", 1.0)
                .with_ingredient("press_cake", 1.0)
                .with_times(10.0, 5.0),
            Recipe::new("press_cake", "Press Cake", 1.0)
                .with_ingredient("pulp", 1.0)
                .with_times(10.0, 5.0),
            Recipe::new("tart", "Tart", 1.0)
                .with_ingredient("pulp", 2.0)
                .with_times(10.0, 5.0),
        ])
        .unwrap();
        let machines = MachineCostModel::new();
        let mut registry = MaterialRegistry::new();
        for recipe in graph.recipes() {
            registry.insert(Material::new(&recipe.id, &recipe.name, Category::Product));
        }
        registry.set_price("press_cake", 2.0).unwrap();
        let engine = CostEngine::new(&graph, &machines);

        for id in ["pulp", "tart"] {
            assert!(matches!(
                engine.preview(&registry, id, &rates(), Multipliers::default()),
                Err(EconomyError::CyclicDependency(_))
            ));
            assert!(matches!(
                engine.evaluate(&mut registry, id, &rates(), Multipliers::default()),
                Err(EconomyError::CyclicDependency(_))
            ));
            let material = registry.get(id).unwrap();
            assert_eq!(material.price, 0.0);
            assert!(!material.calculated);
        }
        assert_eq!(registry.get("press_cake").unwrap().price, 2.0);
    }

    #[test]
    fn report_marks_unset_and_calculated_prices() {
        let mut fx = fixture();
        let engine = CostEngine::new(&fx.graph, &fx.machines);
        engine
            .evaluate(&mut fx.registry, "juice", &rates(), Multipliers::default())
            .unwrap();
        let text = PriceReport::from_registry(&fx.registry, Some(Category::Product)).to_string();
        assert!(text.contains("juice"));
        assert!(text.contains("unset"));
        assert!(text.contains("* last calculated price"));
        assert!(!text.contains("cherry"));
    }
}
