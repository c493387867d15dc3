//! SeedCoin Production Cost Calculator
//!
//! Command-line front end for pricing crafted items in a SeedCoin economy.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use seedcoin_calculator::calculator::{format_evaluation, Multipliers, PriceReport};
use seedcoin_calculator::catalogue::{self, SAMPLE_CATALOGUE};
use seedcoin_calculator::db;
use seedcoin_calculator::harvest::HarvestScenario;
use seedcoin_calculator::models::{Category, MachineField};
use seedcoin_calculator::session::Session;

#[derive(Parser)]
#[command(name = "seedcoin-calculator")]
#[command(about = "Production cost calculator for SeedCoin game economies")]
struct Cli {
    /// Path to the SQLite database holding the session
    #[arg(short, long, default_value = "seedcoin.db")]
    database: PathBuf,

    /// Catalogue file or directory (built-in sample when omitted)
    #[arg(short, long)]
    catalogue: Option<PathBuf>,

    /// Override the hourly income (SeedCoin/hour)
    #[arg(long)]
    hourly_income: Option<f64>,

    /// Override the sustenance rate (SeedCoin/second)
    #[arg(long)]
    sustenance_rate: Option<f64>,

    /// Log debug output to stderr
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price one unit of a recipe's output and store it
    Calc {
        /// Recipe id (the id of the produced material)
        recipe: String,

        /// Skill multiplier applied to the batch cost
        #[arg(long, default_value = "1.0")]
        skill: f64,

        /// Complexity multiplier applied to the batch cost
        #[arg(long, default_value = "1.0")]
        complexity: f64,

        /// Re-price every sub-recipe first
        #[arg(long)]
        chain: bool,

        /// Show required materials and missing prices
        #[arg(short, long)]
        verbose: bool,
    },

    /// List every material a recipe needs, through all sub-recipes
    Requires {
        recipe: String,
    },

    /// Set the price of a material by hand
    SetPrice {
        material: String,
        price: f64,
    },

    /// Edit a machine's worth or number of uses
    SetMachine {
        machine: String,

        #[arg(long)]
        worth: Option<f64>,

        #[arg(long)]
        uses: Option<f64>,
    },

    /// List materials and their current prices
    List {
        /// Only show one category (raw, processed, product)
        #[arg(long)]
        category: Option<Category>,
    },

    /// Product price report
    Report,

    /// List machines and their cost per use
    Machines,

    /// Breakeven price of a gathered base resource
    Harvest {
        #[arg(long, default_value = "45")]
        walking_time: f64,

        #[arg(long, default_value = "10")]
        action_time: f64,

        #[arg(long, default_value = "50")]
        tool_worth: f64,

        #[arg(long, default_value = "150")]
        tool_uses: f64,

        #[arg(long, default_value = "3")]
        harvested: f64,

        #[arg(long, default_value = "1.2")]
        scarcity: f64,

        /// Store the result as this material's price
        #[arg(long)]
        set: Option<String>,
    },

    /// Print the stored session as JSON
    Snapshot,

    /// Forget all prices and machine edits
    Reset,

    /// Write the built-in sample catalogue to a file
    Sample {
        out: PathBuf,
    },

    /// Create the database, dropping any stored session
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match &cli.command {
        Commands::Init => {
            db::clear_session(&conn)?;
            println!("Database initialized at: {}", cli.database.display());
            return Ok(());
        }
        Commands::Sample { out } => {
            fs::write(out, SAMPLE_CATALOGUE)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Sample catalogue written to {}", out.display());
            return Ok(());
        }
        _ => {}
    }

    let loaded = match &cli.catalogue {
        Some(path) => catalogue::load_path(path)?,
        None => catalogue::sample()?,
    };
    tracing::info!("{}", loaded.stats);

    let mut session = Session::new(loaded);
    let stored = db::load_snapshot(&conn)?;
    session.apply_snapshot(&stored);

    let mut rates = session.rates();
    if let Some(income) = cli.hourly_income {
        rates.hourly_income = income;
    }
    if let Some(sustenance) = cli.sustenance_rate {
        rates.sustenance_rate = sustenance;
    }
    session.set_rates(rates);

    if run(&mut session, cli.command)? {
        db::save_snapshot(&mut conn, &session.snapshot())?;
    }

    Ok(())
}

/// Run one command. Returns whether the session changed.
fn run(session: &mut Session, command: Commands) -> Result<bool> {
    match command {
        Commands::Calc {
            recipe,
            skill,
            complexity,
            chain,
            verbose,
        } => {
            if verbose {
                print_requirements(session, &recipe);
            }

            let multipliers = Multipliers { skill, complexity };
            let result = if chain {
                session.evaluate_chain(&recipe, multipliers)
            } else {
                session.evaluate(&recipe, multipliers).map(|e| vec![e])
            };

            match result {
                Ok(evaluations) => {
                    for evaluation in &evaluations {
                        print!("{}", format_evaluation(evaluation, session.registry()));
                    }
                    let flagged = evaluations.iter().filter(|e| !e.is_clean()).count();
                    if flagged > 0 {
                        println!("{} recipe(s) priced with warnings", flagged);
                    }
                    Ok(true)
                }
                Err(err) => {
                    println!("{}: not computable ({})", recipe, err);
                    Ok(false)
                }
            }
        }

        Commands::Requires { recipe } => {
            print_requirements(session, &recipe);
            Ok(session.select(&recipe).is_ok())
        }

        Commands::SetPrice { material, price } => {
            session.set_price(&material, price)?;
            println!("{} = {:.4} SC", material, price);
            Ok(true)
        }

        Commands::SetMachine {
            machine,
            worth,
            uses,
        } => {
            if worth.is_none() && uses.is_none() {
                bail!("nothing to change: pass --worth and/or --uses");
            }
            if let Some(worth) = worth {
                session.update_machine(&machine, MachineField::Worth, worth)?;
            }
            if let Some(uses) = uses {
                session.update_machine(&machine, MachineField::TotalUses, uses)?;
            }
            let id = session.machines().id_of(&machine)?;
            let record = session.machines().get(id)?;
            println!(
                "{}: worth {:.2} SC, {} uses, {:.4} SC per use",
                record.name,
                record.worth,
                record.total_uses,
                record.cost_per_use()
            );
            Ok(true)
        }

        Commands::List { category } => {
            let report = PriceReport::from_registry(session.registry(), category);
            if report.rows.is_empty() {
                println!("No materials in catalogue.");
            } else {
                print!("{}", report);
            }
            Ok(false)
        }

        Commands::Report => {
            let report = PriceReport::from_registry(session.registry(), Some(Category::Product));
            print!("{}", report);
            let pending = report.rows.iter().filter(|r| !r.calculated).count();
            if pending > 0 {
                println!("\n{} product(s) not evaluated yet", pending);
            }
            Ok(false)
        }

        Commands::Machines => {
            println!("{:<24} {:>12} {:>10} {:>12}", "Machine", "Worth (SC)", "Uses", "SC/use");
            println!("{}", "-".repeat(61));
            for (_, machine) in session.machines().iter() {
                println!(
                    "{:<24} {:>12.2} {:>10} {:>12.4}",
                    machine.name,
                    machine.worth,
                    machine.total_uses,
                    machine.cost_per_use()
                );
            }
            Ok(false)
        }

        Commands::Harvest {
            walking_time,
            action_time,
            tool_worth,
            tool_uses,
            harvested,
            scarcity,
            set,
        } => {
            let scenario = HarvestScenario {
                walking_time,
                action_time,
                tool_worth,
                tool_uses,
                harvested,
                scarcity,
            };
            let breakdown = scenario.price(&session.rates());
            print!("{}", breakdown);

            match set {
                Some(material) => {
                    session.set_price(&material, breakdown.unit_price)?;
                    println!("Stored as price of {}", material);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        Commands::Snapshot => {
            println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            Ok(false)
        }

        Commands::Reset => {
            session.reset();
            println!("Prices and machine edits cleared.");
            Ok(true)
        }

        Commands::Sample { .. } | Commands::Init => Ok(false),
    }
}

fn print_requirements(session: &Session, recipe: &str) {
    let required = match session.required_materials(recipe) {
        Ok(required) => required,
        Err(err) => {
            println!("{}: {}", recipe, err);
            return;
        }
    };

    if let Ok(r) = session.graph().find(recipe) {
        let machine = r
            .machine
            .and_then(|id| session.machines().get(id).ok())
            .map_or("by hand", |m| m.name.as_str());
        println!("{} ({})", r.name, r.id);
        println!(
            "  skill: {}, machine: {}, manual {:.0}s / auto {:.0}s, yields {}",
            if r.skill_name.is_empty() { "none" } else { r.skill_name.as_str() },
            machine,
            r.manual_time,
            r.auto_time,
            r.amount
        );
        if let Some(by) = &r.crafted_by {
            println!("  crafted by: {}", by);
        }
        if let Some(on) = &r.stored_on {
            println!("  stored on: {}", on);
        }
    }

    println!("{} requires:", recipe);
    for id in &required {
        let line = match session.registry().get(id) {
            Ok(m) if m.is_priced() => format!("{:.4} SC", m.price),
            Ok(_) => "unset".to_string(),
            Err(_) => "unknown material".to_string(),
        };
        println!("  {:<24} {}", id, line);
    }

    if let Ok(unpriced) = session.unpriced(recipe) {
        if !unpriced.is_empty() {
            println!("Set these prices first: {}", unpriced.join(", "));
        }
    }
    println!();
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
