//! Material price registry

use std::collections::HashMap;

use tracing::warn;

use crate::error::{non_negative, EconomyError, EconomyResult};
use crate::models::{Category, Material};

/// Single source of truth for material prices.
///
/// Materials keep their insertion order so listings and reports are stable.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<Material>,
    index: HashMap<String, usize>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material. Returns `false` and keeps the existing entry when the id
    /// is already registered.
    pub fn insert(&mut self, material: Material) -> bool {
        if self.index.contains_key(&material.id) {
            warn!(id = %material.id, "duplicate material id ignored");
            return false;
        }
        self.index.insert(material.id.clone(), self.materials.len());
        self.materials.push(material);
        true
    }

    pub fn get(&self, id: &str) -> EconomyResult<&Material> {
        self.index
            .get(id)
            .map(|&i| &self.materials[i])
            .ok_or_else(|| EconomyError::MaterialNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Overwrite a price as a direct edit. Clears the "calculated" mark.
    pub fn set_price(&mut self, id: &str, price: f64) -> EconomyResult<()> {
        let price = non_negative("price", price)?;
        let material = self.get_mut(id)?;
        material.price = price;
        material.calculated = false;
        Ok(())
    }

    /// Write a price produced by the cost engine.
    pub(crate) fn record_calculated(&mut self, id: &str, price: f64) -> EconomyResult<()> {
        let material = self.get_mut(id)?;
        material.price = price;
        material.calculated = true;
        Ok(())
    }

    /// Restore a stored price together with its calculated mark.
    pub(crate) fn restore(&mut self, id: &str, price: f64, calculated: bool) -> EconomyResult<()> {
        let price = non_negative("price", price)?;
        let material = self.get_mut(id)?;
        material.price = price;
        material.calculated = calculated;
        Ok(())
    }

    /// Materials in insertion order, optionally restricted to one category.
    pub fn list(&self, category: Option<Category>) -> Vec<&Material> {
        self.materials
            .iter()
            .filter(|m| category.is_none_or(|c| m.category == c))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    fn get_mut(&mut self, id: &str) -> EconomyResult<&mut Material> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.materials[i]),
            None => Err(EconomyError::MaterialNotFound(id.to_string())),
        }
    }
}
