//! Shared machine records and their per-use cost

use std::collections::HashMap;

use crate::error::{non_negative, EconomyError, EconomyResult};
use crate::models::{Machine, MachineField, MachineId};

/// Owns the canonical machine records. Recipes refer to them by `MachineId`,
/// so an edit here is seen by every recipe using the machine.
#[derive(Debug, Clone, Default)]
pub struct MachineCostModel {
    machines: Vec<Machine>,
    by_name: HashMap<String, MachineId>,
}

impl MachineCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, registering a zero-cost machine if unseen.
    pub fn intern(&mut self, name: &str) -> MachineId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        self.push(Machine::new(name, 0.0, 0.0))
    }

    /// Register or overwrite a machine's parameters.
    pub fn define(&mut self, machine: Machine) -> EconomyResult<MachineId> {
        non_negative("worth", machine.worth)?;
        non_negative("total_uses", machine.total_uses)?;
        match self.by_name.get(&machine.name) {
            Some(&id) => {
                self.machines[id.0] = machine;
                Ok(id)
            }
            None => Ok(self.push(machine)),
        }
    }

    pub fn id_of(&self, name: &str) -> EconomyResult<MachineId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| EconomyError::MachineNotFound(name.to_string()))
    }

    pub fn get(&self, id: MachineId) -> EconomyResult<&Machine> {
        self.machines
            .get(id.0)
            .ok_or_else(|| EconomyError::MachineNotFound(format!("#{}", id.0)))
    }

    pub fn cost_per_use(&self, id: MachineId) -> EconomyResult<f64> {
        Ok(self.get(id)?.cost_per_use())
    }

    /// Change one field; the derived cost follows on the next read.
    pub fn update(&mut self, id: MachineId, field: MachineField, value: f64) -> EconomyResult<()> {
        let value = non_negative(field.label(), value)?;
        let machine = self
            .machines
            .get_mut(id.0)
            .ok_or_else(|| EconomyError::MachineNotFound(format!("#{}", id.0)))?;
        match field {
            MachineField::Worth => machine.worth = value,
            MachineField::TotalUses => machine.total_uses = value,
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MachineId, &Machine)> {
        self.machines
            .iter()
            .enumerate()
            .map(|(i, m)| (MachineId(i), m))
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    fn push(&mut self, machine: Machine) -> MachineId {
        let id = MachineId(self.machines.len());
        self.by_name.insert(machine.name.clone(), id);
        self.machines.push(machine);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable_per_name() {
        let mut model = MachineCostModel::new();
        let a = model.intern("Sawbench");
        let b = model.intern("Anvil");
        assert_ne!(a, b);
        assert_eq!(model.intern("Sawbench"), a);
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn update_recomputes_cost_per_use() {
        let mut model = MachineCostModel::new();
        let id = model.define(Machine::new("Sawbench", 1000.0, 100.0)).unwrap();
        assert_eq!(model.cost_per_use(id).unwrap(), 10.0);

        model.update(id, MachineField::Worth, 500.0).unwrap();
        assert_eq!(model.cost_per_use(id).unwrap(), 5.0);

        model.update(id, MachineField::TotalUses, 0.0).unwrap();
        assert_eq!(model.cost_per_use(id).unwrap(), 0.0);
    }

    #[test]
    fn define_overwrites_existing_record_in_place() {
        let mut model = MachineCostModel::new();
        let id = model.intern("Kiln");
        let again = model.define(Machine::new("Kiln", 300.0, 30.0)).unwrap();
        assert_eq!(id, again);
        assert_eq!(model.cost_per_use(id).unwrap(), 10.0);
    }

    #[test]
    fn update_rejects_negative_values() {
        let mut model = MachineCostModel::new();
        let id = model.intern("Kiln");
        assert_eq!(
            model.update(id, MachineField::Worth, -5.0),
            Err(EconomyError::InvalidValue {
                field: "worth",
                value: -5.0
            })
        );
    }
}
