//! Docgraph CLI
//!
//! Command-line front end over a JSON fixture (models + seed records):
//! - `populate`: resolve every record reachable from the chosen roots and print
//!   the bucketed result as lean JSON
//! - `check`: build the type registry for every declared model and list the
//!   relationships it found

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use docgraph_populate::{Cardinality, ModelRegistry, PopulateConfig, PopulateEngine, Relationship};
use docgraph_store::{Fixture, MemoryStore, Record};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docgraph")]
#[command(author, version, about = "Docgraph: populate document reference graphs")]
struct Cli {
    /// Log verbosity on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate root records from a fixture and print the result as JSON.
    Populate {
        /// Fixture file with `models` and `records`
        fixture: PathBuf,
        /// Model of the root records
        #[arg(long)]
        model: String,
        /// Root record ids (default: every record of the model)
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Fail on dangling ids and on non-id values in reference fields
        #[arg(long)]
        strict: bool,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// Report record and lookup counts on stderr
        #[arg(long)]
        stats: bool,
    },

    /// Build the type registry for every model of a fixture and list it.
    Check {
        /// Fixture file with `models`
        fixture: PathBuf,
        /// Emit the registry as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Populate {
            fixture,
            model,
            ids,
            strict,
            pretty,
            stats,
        } => cmd_populate(&fixture, &model, &ids, strict, pretty, stats),
        Commands::Check { fixture, json } => cmd_check(&fixture, json),
    };

    if let Err(err) = result {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// populate
// ============================================================================

fn cmd_populate(
    path: &Path,
    model: &str,
    ids: &[String],
    strict: bool,
    pretty: bool,
    stats: bool,
) -> Result<()> {
    let fixture = Fixture::load(path)?;
    let catalog = Arc::new(fixture.catalog());
    if catalog.model(model).is_none() {
        bail!("fixture declares no model `{model}`");
    }

    let store = Arc::new(MemoryStore::new());
    fixture.seed(&store)?;
    let roots = select_roots(&store, model, ids)?;

    let config = if strict {
        PopulateConfig::strict()
    } else {
        PopulateConfig::default()
    };
    let engine = PopulateEngine::new(catalog, store.clone()).with_config(config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let populated = runtime
        .block_on(engine.populate_models(roots))
        .with_context(|| format!("failed to populate {model}"))?;

    let out = if pretty {
        serde_json::to_string_pretty(&populated)?
    } else {
        serde_json::to_string(&populated)?
    };
    println!("{out}");

    if stats {
        eprintln!(
            "{} {} records in {} buckets ({} lookups)",
            "ok".green().bold(),
            populated.len(),
            populated.keys().count(),
            store.stats().total()
        );
    }
    Ok(())
}

/// Root records of `model`: the requested ids in order, or all of them.
fn select_roots(store: &MemoryStore, model: &str, ids: &[String]) -> Result<Vec<Record>> {
    let all = store.all(model)?;
    if ids.is_empty() {
        return Ok(all);
    }

    ids.iter()
        .map(|id| {
            all.iter()
                .find(|record| record.id.as_str() == id)
                .cloned()
                .with_context(|| format!("no {model} record with id `{id}`"))
        })
        .collect()
}

// ============================================================================
// check
// ============================================================================

fn cmd_check(path: &Path, json: bool) -> Result<()> {
    let fixture = Fixture::load(path)?;
    let catalog = fixture.catalog();

    let mut registry = ModelRegistry::new();
    for schema in catalog.models() {
        registry
            .add_model(&catalog, schema)
            .with_context(|| format!("model `{}`", schema.name))?;
    }

    if json {
        let report: serde_json::Map<String, serde_json::Value> = registry
            .keys()
            .map(|key| {
                let entry = serde_json::json!({
                    "model": registry.model_name(key.as_str()),
                    "relationships": registry.relationships(key.as_str()),
                });
                (key.to_string(), entry)
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for key in registry.keys() {
        println!(
            "{} ({})",
            key.as_str().bold(),
            registry.model_name(key.as_str()).unwrap_or("?")
        );
        for rel in registry.relationships(key.as_str()) {
            let line = describe(&rel);
            if registry.contains(rel.target.as_str()) {
                println!("  {line}");
            } else {
                println!("  {line} {}", "(unresolved)".yellow());
            }
        }
    }
    Ok(())
}

fn describe(rel: &Relationship) -> String {
    let field = match &rel.embedding_path {
        Some(path) => format!("{}.{}", path.join("."), rel.field),
        None => rel.field.clone(),
    };
    let arity = match rel.cardinality {
        Cardinality::One => "one",
        Cardinality::Many => "many",
    };
    format!("{field} -> {} [{arity}]", rel.target)
}
