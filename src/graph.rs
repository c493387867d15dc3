//! Recipe catalogue keyed by output material id

use std::collections::HashMap;

use crate::error::{EconomyError, EconomyResult};
use crate::models::{Ingredient, Recipe};

/// Read-only catalogue of recipes. Each recipe id is also the id of the
/// material it produces, so "is this ingredient craftable" is a lookup here.
#[derive(Debug, Clone, Default)]
pub struct RecipeGraph {
    recipes: Vec<Recipe>,
    by_output: HashMap<String, usize>,
}

impl RecipeGraph {
    /// Build the graph. Duplicate or empty recipe ids are a catalogue error.
    pub fn new(recipes: Vec<Recipe>) -> EconomyResult<Self> {
        let mut by_output = HashMap::with_capacity(recipes.len());
        for (i, recipe) in recipes.iter().enumerate() {
            if recipe.id.trim().is_empty() {
                return Err(EconomyError::InvalidCatalogue(format!(
                    "recipe '{}' has an empty id",
                    recipe.name
                )));
            }
            if by_output.insert(recipe.id.clone(), i).is_some() {
                return Err(EconomyError::InvalidCatalogue(format!(
                    "recipe id '{}' is defined more than once",
                    recipe.id
                )));
            }
        }
        Ok(Self { recipes, by_output })
    }

    pub fn find(&self, recipe_id: &str) -> EconomyResult<&Recipe> {
        self.by_output
            .get(recipe_id)
            .map(|&i| &self.recipes[i])
            .ok_or_else(|| EconomyError::RecipeNotFound(recipe_id.to_string()))
    }

    /// Direct ingredients of a recipe, empty for unknown ids.
    pub fn ingredients_of(&self, recipe_id: &str) -> &[Ingredient] {
        self.find(recipe_id)
            .map(|r| r.ingredients.as_slice())
            .unwrap_or(&[])
    }

    pub fn produces(&self, material_id: &str) -> bool {
        self.by_output.contains_key(material_id)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
