//! Session state over a loaded catalogue
//!
//! A `Session` owns the mutable registries for one run and routes every
//! engine call through them. Its state can be exported as a plain-data
//! `SessionSnapshot` and applied again to a freshly loaded catalogue.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculator::{CostEngine, Evaluation, Multipliers};
use crate::catalogue::Catalogue;
use crate::error::{EconomyError, EconomyResult};
use crate::graph::RecipeGraph;
use crate::machines::MachineCostModel;
use crate::models::{GlobalRates, Machine, MachineField};
use crate::registry::MaterialRegistry;
use crate::resolver::DependencyResolver;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub material_id: String,
    pub price: f64,
}

/// Plain-data session state handed to and from a storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub prices: Vec<PriceEntry>,
    pub machines: Vec<Machine>,
    /// Materials whose price was last written by the cost engine.
    pub evaluated: Vec<String>,
    pub last_selected: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    initial: Catalogue,
    registry: MaterialRegistry,
    graph: RecipeGraph,
    machines: MachineCostModel,
    rates: GlobalRates,
    last_selected: Option<String>,
}

impl Session {
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            registry: catalogue.registry.clone(),
            graph: catalogue.graph.clone(),
            machines: catalogue.machines.clone(),
            rates: catalogue.rates,
            last_selected: None,
            initial: catalogue,
        }
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn graph(&self) -> &RecipeGraph {
        &self.graph
    }

    pub fn machines(&self) -> &MachineCostModel {
        &self.machines
    }

    pub fn rates(&self) -> GlobalRates {
        self.rates
    }

    pub fn set_rates(&mut self, rates: GlobalRates) {
        self.rates = rates;
    }

    pub fn last_selected(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn select(&mut self, recipe_id: &str) -> EconomyResult<()> {
        self.graph.find(recipe_id)?;
        self.last_selected = Some(recipe_id.to_string());
        Ok(())
    }

    /// Evaluate with the session's rates and remember the recipe as selected.
    pub fn evaluate(&mut self, recipe_id: &str, multipliers: Multipliers) -> EconomyResult<Evaluation> {
        let rates = self.rates;
        let evaluation = CostEngine::new(&self.graph, &self.machines).evaluate(
            &mut self.registry,
            recipe_id,
            &rates,
            multipliers,
        )?;
        self.last_selected = Some(recipe_id.to_string());
        Ok(evaluation)
    }

    pub fn evaluate_chain(
        &mut self,
        recipe_id: &str,
        multipliers: Multipliers,
    ) -> EconomyResult<Vec<Evaluation>> {
        let rates = self.rates;
        let evaluations = CostEngine::new(&self.graph, &self.machines).evaluate_chain(
            &mut self.registry,
            recipe_id,
            &rates,
            multipliers,
        )?;
        self.last_selected = Some(recipe_id.to_string());
        Ok(evaluations)
    }

    pub fn required_materials(&self, recipe_id: &str) -> EconomyResult<BTreeSet<String>> {
        DependencyResolver::new(&self.graph).required_materials(recipe_id)
    }

    pub fn unpriced(&self, recipe_id: &str) -> EconomyResult<Vec<String>> {
        DependencyResolver::new(&self.graph).unpriced(recipe_id, &self.registry)
    }

    pub fn set_price(&mut self, material_id: &str, price: f64) -> EconomyResult<()> {
        self.registry.set_price(material_id, price)
    }

    pub fn update_machine(&mut self, name: &str, field: MachineField, value: f64) -> EconomyResult<()> {
        let id = self.machines.id_of(name)?;
        self.machines.update(id, field, value)
    }

    /// Edit the machine a recipe runs on. Every recipe sharing it sees the change.
    pub fn update_machine_for_recipe(
        &mut self,
        recipe_id: &str,
        field: MachineField,
        value: f64,
    ) -> EconomyResult<()> {
        let recipe = self.graph.find(recipe_id)?;
        let id = recipe
            .machine
            .ok_or_else(|| EconomyError::MachineNotFound(format!("recipe '{}' uses no machine", recipe_id)))?;
        self.machines.update(id, field, value)
    }

    pub fn machine_cost_for_recipe(&self, recipe_id: &str) -> EconomyResult<f64> {
        match self.graph.find(recipe_id)?.machine {
            Some(id) => self.machines.cost_per_use(id),
            None => Ok(0.0),
        }
    }

    /// Drop all edits and return to the catalogue as loaded.
    pub fn reset(&mut self) {
        self.registry = self.initial.registry.clone();
        self.machines = self.initial.machines.clone();
        self.rates = self.initial.rates;
        self.last_selected = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let prices = self
            .registry
            .iter()
            .filter(|m| m.price != 0.0 || m.calculated)
            .map(|m| PriceEntry {
                material_id: m.id.clone(),
                price: m.price,
            })
            .collect();
        let evaluated = self
            .registry
            .iter()
            .filter(|m| m.calculated)
            .map(|m| m.id.clone())
            .collect();
        let machines = self.machines.iter().map(|(_, m)| m.clone()).collect();

        SessionSnapshot {
            prices,
            machines,
            evaluated,
            last_selected: self.last_selected.clone(),
        }
    }

    /// Apply stored state on top of the loaded catalogue.
    ///
    /// Entries naming ids the catalogue no longer has are skipped and
    /// returned so the caller can report them.
    pub fn apply_snapshot(&mut self, snapshot: &SessionSnapshot) -> Vec<EconomyError> {
        let mut skipped = Vec::new();
        let evaluated: BTreeSet<&str> = snapshot.evaluated.iter().map(String::as_str).collect();

        for entry in &snapshot.prices {
            let calculated = evaluated.contains(entry.material_id.as_str());
            if let Err(err) = self.registry.restore(&entry.material_id, entry.price, calculated) {
                skipped.push(err);
            }
        }

        for machine in &snapshot.machines {
            let result = self.machines.id_of(&machine.name).and_then(|id| {
                self.machines.update(id, MachineField::Worth, machine.worth)?;
                self.machines.update(id, MachineField::TotalUses, machine.total_uses)
            });
            if let Err(err) = result {
                skipped.push(err);
            }
        }

        self.last_selected = match &snapshot.last_selected {
            Some(id) if self.graph.find(id).is_ok() => Some(id.clone()),
            Some(id) => {
                skipped.push(EconomyError::RecipeNotFound(id.clone()));
                None
            }
            None => None,
        };

        for err in &skipped {
            warn!(%err, "stored session entry skipped");
        }
        debug!(
            prices = snapshot.prices.len(),
            machines = snapshot.machines.len(),
            skipped = skipped.len(),
            "session snapshot applied"
        );
        skipped
    }
}

/// A session shared between callers.
///
/// Each call holds the lock for its whole duration, so an evaluation reads
/// its ingredients and machine and writes its result without a concurrent
/// edit slipping in between.
#[derive(Debug)]
pub struct SharedSession {
    inner: Mutex<Session>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    pub fn evaluate(&self, recipe_id: &str, multipliers: Multipliers) -> EconomyResult<Evaluation> {
        self.inner.lock().evaluate(recipe_id, multipliers)
    }

    pub fn set_price(&self, material_id: &str, price: f64) -> EconomyResult<()> {
        self.inner.lock().set_price(material_id, price)
    }

    pub fn update_machine(&self, name: &str, field: MachineField, value: f64) -> EconomyResult<()> {
        self.inner.lock().update_machine(name, field, value)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    /// Run several steps as one transaction.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> Session {
        self.inner.into_inner()
    }
}
