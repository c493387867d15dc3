//! Transitive material requirements of a recipe
//!
//! Traversal is an explicit depth-first walk over a frame stack. The ids on
//! the current path are tracked so that a loop in the catalogue becomes a
//! `CyclicDependency` error instead of unbounded recursion.

use std::collections::{BTreeSet, HashSet};

use crate::error::{EconomyError, EconomyResult};
use crate::graph::RecipeGraph;
use crate::models::Recipe;
use crate::registry::MaterialRegistry;

pub struct DependencyResolver<'a> {
    graph: &'a RecipeGraph,
}

/// Everything learned from one walk below a recipe.
struct Walk {
    required: BTreeSet<String>,
    /// Recipe ids in dependency order, the walked recipe last.
    order: Vec<String>,
}

/// Where a walk ran into a loop: the path of recipe ids and the id that closed it.
struct CycleTrace {
    path: Vec<String>,
    id: String,
}

struct Frame<'g> {
    recipe: &'g Recipe,
    next: usize,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(graph: &'a RecipeGraph) -> Self {
        Self { graph }
    }

    /// Every material id the recipe needs, directly or through sub-recipes.
    pub fn required_materials(&self, recipe_id: &str) -> EconomyResult<BTreeSet<String>> {
        Ok(self.walk_checked(recipe_id)?.required)
    }

    /// Recipe ids to evaluate so that every sub-recipe is priced before the
    /// recipes consuming it. The requested recipe comes last.
    pub fn evaluation_order(&self, recipe_id: &str) -> EconomyResult<Vec<String>> {
        Ok(self.walk_checked(recipe_id)?.order)
    }

    /// Required materials that no recipe produces and that still have no price.
    pub fn unpriced(&self, recipe_id: &str, registry: &MaterialRegistry) -> EconomyResult<Vec<String>> {
        let required = self.required_materials(recipe_id)?;
        Ok(required
            .into_iter()
            .filter(|id| !self.graph.produces(id))
            .filter(|id| registry.get(id).ok().is_none_or(|m| !m.is_priced()))
            .collect())
    }

    /// First loop found anywhere in the catalogue, as the chain of recipe ids
    /// ending with the id that repeats.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        for recipe in self.graph.recipes() {
            if let Err(Some(trace)) = self.walk(recipe) {
                let start = trace.path.iter().position(|id| *id == trace.id).unwrap_or(0);
                let mut cycle = trace.path[start..].to_vec();
                cycle.push(trace.id);
                return Some(cycle);
            }
        }
        None
    }

    fn walk_checked(&self, recipe_id: &str) -> EconomyResult<Walk> {
        let root = self.graph.find(recipe_id)?;
        self.walk(root).map_err(|trace| match trace {
            Some(trace) => EconomyError::CyclicDependency(trace.id),
            None => EconomyError::CyclicDependency(recipe_id.to_string()),
        })
    }

    /// `Err(None)` means the depth limit was hit without a repeated id, which
    /// only a malformed graph can cause.
    fn walk(&self, root: &'a Recipe) -> Result<Walk, Option<CycleTrace>> {
        let limit = self.graph.len();
        let mut stack = vec![Frame { recipe: root, next: 0 }];
        let mut on_path: HashSet<&str> = HashSet::from([root.id.as_str()]);
        let mut done: HashSet<&str> = HashSet::new();
        let mut required = BTreeSet::new();
        let mut order = Vec::new();

        loop {
            let Some(frame) = stack.last_mut() else { break };
            let recipe = frame.recipe;
            let Some(ingredient) = recipe.ingredients.get(frame.next) else {
                stack.pop();
                on_path.remove(recipe.id.as_str());
                done.insert(recipe.id.as_str());
                order.push(recipe.id.clone());
                continue;
            };
            frame.next += 1;

            let id = ingredient.material_id.as_str();
            required.insert(id.to_string());

            if on_path.contains(id) {
                return Err(Some(CycleTrace {
                    path: stack.iter().map(|f| f.recipe.id.clone()).collect(),
                    id: id.to_string(),
                }));
            }
            if done.contains(id) {
                continue;
            }
            if let Ok(sub) = self.graph.find(id) {
                if stack.len() >= limit {
                    return Err(None);
                }
                on_path.insert(sub.id.as_str());
                stack.push(Frame { recipe: sub, next: 0 });
            }
        }

        Ok(Walk { required, order })
    }
}
