//! Catalogue loading from TOML files
//!
//! A catalogue is a single `.toml` file or a directory of them. Files are
//! merged in path order, then turned into the registry, recipe graph and
//! machine model the engine works on.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::graph::RecipeGraph;
use crate::machines::MachineCostModel;
use crate::models::{Category, GlobalRates, Ingredient, Machine, Material, Recipe};
use crate::rates::{Sustenance, DEFAULT_HOURLY_INCOME};
use crate::registry::MaterialRegistry;
use crate::resolver::DependencyResolver;

/// Built-in catalogue used when no path is given.
pub const SAMPLE_CATALOGUE: &str = include_str!("../catalogue/sample.toml");

/// Raw catalogue data as written in TOML
#[derive(Debug, Default, Deserialize)]
pub struct CatalogueFile {
    #[serde(default)]
    pub rates: Option<RatesConfig>,
    #[serde(default)]
    pub sustenance: Option<Sustenance>,
    #[serde(default)]
    pub materials: Vec<MaterialConfig>,
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub recipes: Vec<RecipeConfig>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct RatesConfig {
    pub hourly_income: Option<f64>,
    pub sustenance_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct MaterialConfig {
    pub id: String,
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub struct RecipeConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientConfig>,
    #[serde(default)]
    pub manual_time: f64,
    #[serde(default)]
    pub auto_time: f64,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub skill: String,
    pub amount: f64,
    pub stored_on: Option<String>,
    pub crafted_by: Option<String>,
}

/// `"2 x plank"` or `{ material = "plank", quantity = 2 }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngredientConfig {
    Shorthand(String),
    Table { material: String, quantity: f64 },
}

impl CatalogueFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid catalogue TOML")
    }

    /// Append another file's entries. Later rate settings win.
    pub fn merge(&mut self, other: CatalogueFile) {
        if other.rates.is_some() {
            self.rates = other.rates;
        }
        if other.sustenance.is_some() {
            self.sustenance = other.sustenance;
        }
        self.materials.extend(other.materials);
        self.machines.extend(other.machines);
        self.recipes.extend(other.recipes);
    }
}

/// Everything the engine needs, built from a catalogue.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub registry: MaterialRegistry,
    pub graph: RecipeGraph,
    pub machines: MachineCostModel,
    pub rates: GlobalRates,
    pub stats: LoadStats,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadStats {
    pub files: usize,
    pub materials: usize,
    pub recipes: usize,
    pub machines: usize,
    pub missing_ingredients: usize,
    /// A recipe loop, if the catalogue has one. Recipes reaching it cannot be priced.
    pub cycle: Option<Vec<String>>,
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} materials, {} recipes, {} machines from {} file(s). Unknown ingredients: {}",
            self.materials, self.recipes, self.machines, self.files, self.missing_ingredients
        )?;
        if let Some(cycle) = &self.cycle {
            write!(f, ". Recipe loop: {}", cycle.join(" -> "))?;
        }
        Ok(())
    }
}

/// Find all catalogue files below a directory, in path order
pub fn find_catalogue_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Load a catalogue from a file or a directory of files
pub fn load_path(path: &Path) -> Result<Catalogue> {
    let files = if path.is_dir() {
        find_catalogue_files(path)?
    } else {
        vec![path.to_path_buf()]
    };
    if files.is_empty() {
        bail!("no catalogue files found in {}", path.display());
    }

    let mut merged = CatalogueFile::default();
    for file in &files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let parsed = CatalogueFile::parse(&text)
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        merged.merge(parsed);
    }

    let mut catalogue = build(merged)?;
    catalogue.stats.files = files.len();
    Ok(catalogue)
}

/// Load the built-in sample catalogue
pub fn sample() -> Result<Catalogue> {
    let mut catalogue = build(CatalogueFile::parse(SAMPLE_CATALOGUE)?)?;
    catalogue.stats.files = 1;
    Ok(catalogue)
}

/// Turn raw catalogue data into engine structures.
///
/// Malformed structure (bad ingredient entries, empty or duplicate ids,
/// negative numbers) fails the whole load.
pub fn build(file: CatalogueFile) -> Result<Catalogue> {
    let shorthand_re = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:[xX*]\s+|\s+)([\w\-]+)\s*$")?;
    let mut stats = LoadStats::default();

    let mut machines = MachineCostModel::new();
    for machine in file.machines {
        let name = machine.name.clone();
        machines
            .define(machine)
            .with_context(|| format!("machine '{}'", name))?;
    }

    let mut recipes = Vec::with_capacity(file.recipes.len());
    for config in file.recipes {
        recipes.push(convert_recipe(config, &shorthand_re, &mut machines)?);
    }

    let mut registry = MaterialRegistry::new();
    for config in file.materials {
        if config.id.trim().is_empty() {
            bail!("material '{}' has an empty id", config.name);
        }
        registry.insert(Material::new(config.id, config.name, config.category));
    }
    // Every recipe output is a product material unless already listed.
    for recipe in &recipes {
        if !registry.contains(&recipe.id) {
            registry.insert(Material::new(&recipe.id, &recipe.name, Category::Product));
        }
    }

    for recipe in &recipes {
        for ingredient in &recipe.ingredients {
            if !registry.contains(&ingredient.material_id) {
                warn!(
                    recipe = %recipe.id,
                    material = %ingredient.material_id,
                    "recipe uses a material missing from the catalogue"
                );
                stats.missing_ingredients += 1;
            }
        }
    }

    let rates = resolve_rates(file.rates, file.sustenance);
    let graph = RecipeGraph::new(recipes)?;

    stats.cycle = DependencyResolver::new(&graph).find_cycle();
    if let Some(cycle) = &stats.cycle {
        warn!(cycle = %cycle.join(" -> "), "catalogue contains a recipe loop");
    }

    stats.materials = registry.len();
    stats.recipes = graph.len();
    stats.machines = machines.len();
    info!(
        materials = stats.materials,
        recipes = stats.recipes,
        machines = stats.machines,
        "catalogue loaded"
    );

    Ok(Catalogue {
        registry,
        graph,
        machines,
        rates,
        stats,
    })
}

fn convert_recipe(
    config: RecipeConfig,
    shorthand_re: &Regex,
    machines: &mut MachineCostModel,
) -> Result<Recipe> {
    let id = config.id;
    if !(config.amount.is_finite() && config.amount >= 0.0) {
        bail!("recipe '{}' has invalid amount {}", id, config.amount);
    }
    for (field, value) in [("manual_time", config.manual_time), ("auto_time", config.auto_time)] {
        if !(value.is_finite() && value >= 0.0) {
            bail!("recipe '{}' has invalid {} {}", id, field, value);
        }
    }

    let mut ingredients = Vec::with_capacity(config.ingredients.len());
    for entry in config.ingredients {
        let (material_id, quantity) = match entry {
            IngredientConfig::Table { material, quantity } => (material, quantity),
            IngredientConfig::Shorthand(text) => {
                // "2 x" is a quantity and a separator, not 2 of material "x".
                let Some(cap) = shorthand_re
                    .captures(&text)
                    .filter(|cap| !matches!(&cap[2], "x" | "X"))
                else {
                    bail!("recipe '{}' has malformed ingredient '{}'", id, text);
                };
                let quantity = cap[1]
                    .parse::<f64>()
                    .with_context(|| format!("recipe '{}' ingredient '{}'", id, text))?;
                (cap[2].to_string(), quantity)
            }
        };
        if material_id.trim().is_empty() {
            bail!("recipe '{}' has an ingredient with an empty material id", id);
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            bail!(
                "recipe '{}' needs a positive quantity of '{}', got {}",
                id,
                material_id,
                quantity
            );
        }
        ingredients.push(Ingredient::new(material_id, quantity));
    }

    let machine_name = config.machine.trim();
    let machine = if machine_name.is_empty() || machine_name.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(machines.intern(machine_name))
    };

    Ok(Recipe {
        id,
        name: config.name,
        ingredients,
        manual_time: config.manual_time,
        auto_time: config.auto_time,
        machine,
        skill_name: config.skill,
        amount: config.amount,
        stored_on: config.stored_on,
        crafted_by: config.crafted_by,
    })
}

fn resolve_rates(rates: Option<RatesConfig>, sustenance: Option<Sustenance>) -> GlobalRates {
    let rates = rates.unwrap_or_default();
    let hourly_income = rates.hourly_income.unwrap_or(DEFAULT_HOURLY_INCOME);
    let sustenance_rate = rates
        .sustenance_rate
        .unwrap_or_else(|| sustenance.unwrap_or_default().rate());
    GlobalRates::new(hourly_income, sustenance_rate)
}
