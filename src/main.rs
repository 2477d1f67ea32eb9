use anyhow::{anyhow, bail, Context};
use atomx::{
    reference_dataset, AtomId, AtomKind, Dataset, Engine, EngineConfig, HybridQuery,
    RelationshipType, Routine, RoutineEntry, SearchFilter, SnapshotManager, Weighting,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Skincare ingredient intelligence engine
#[derive(Parser, Debug)]
#[command(name = "atomx")]
#[command(about = "Check skincare routines and search ingredients", long_about = None)]
struct Args {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset to load instead of the bundled reference data
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a routine file for conflicts and range violations
    Check { routine: PathBuf },

    /// Rank atoms by hybrid similarity
    Search {
        /// Use this atom's tensor and embedding as the query
        #[arg(long, conflicts_with = "tensor")]
        like: Option<String>,

        /// Query tensor as dimension=value pairs, e.g. hydration=0.9,soothing=0.4
        #[arg(long)]
        tensor: Option<String>,

        /// Value for dimensions --tensor does not name
        #[arg(long, default_value_t = 0.0)]
        fill: f32,

        #[arg(short, long, default_value_t = 5)]
        k: usize,

        #[arg(long)]
        tensor_weight: Option<f32>,

        #[arg(long)]
        semantic_weight: Option<f32>,

        /// Only return atoms of this kind
        #[arg(long)]
        kind: Option<String>,
    },

    /// Outgoing relationships of an atom
    Neighbors {
        atom: String,

        /// e.g. CONFLICTS_WITH
        #[arg(long = "type")]
        kind: Option<String>,
    },

    /// Shortest directed relationship path between two atoms
    Path {
        from: String,
        to: String,

        #[arg(long, default_value_t = 3)]
        max_depth: usize,
    },

    /// Write a gzip snapshot of the loaded data
    Snapshot { dir: PathBuf },

    /// Everything known about one atom
    Show { atom: String },
}

/// Routine files may be a bare list of entries
#[derive(Deserialize)]
#[serde(untagged)]
enum RoutineFile {
    Routine(Routine),
    Entries(Vec<RoutineEntry>),
}

fn read_routine(path: &Path) -> anyhow::Result<Routine> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read routine {}", path.display()))?;
    let file: RoutineFile = serde_json::from_str(&json)
        .with_context(|| format!("Invalid routine {}", path.display()))?;
    Ok(match file {
        RoutineFile::Routine(routine) => routine,
        RoutineFile::Entries(entries) => Routine::new(entries),
    })
}

fn parse_tensor(spec: &str) -> anyhow::Result<HashMap<String, f32>> {
    spec.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("expected dimension=value, got '{}'", pair))?;
            let value: f32 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value for '{}'", name.trim()))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_engine(args: &Args) -> anyhow::Result<Engine> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(config)?;

    let dataset = match &args.dataset {
        Some(path) => Dataset::from_file(path)?,
        None => reference_dataset()?,
    };
    let stats = engine.load_dataset(&dataset)?;
    info!(atoms = stats.atoms, relationships = stats.relationships, "engine ready");
    Ok(engine)
}

fn run(args: Args) -> anyhow::Result<()> {
    let engine = build_engine(&args)?;

    match args.command {
        Command::Check { routine } => {
            let routine = read_routine(&routine)?;
            let report = engine.check_routine(&routine)?;
            print_json(&serde_json::json!({
                "summary": report.summary(),
                "report": report,
            }))
        }
        Command::Search {
            like,
            tensor,
            fill,
            k,
            tensor_weight,
            semantic_weight,
            kind,
        } => {
            let default = engine.config().default_weighting;
            let weighting = Weighting::new(
                tensor_weight.unwrap_or(default.tensor),
                semantic_weight.unwrap_or(default.semantic),
            );
            let filter = match kind {
                Some(kind) => SearchFilter::kind(kind.parse::<AtomKind>().map_err(|e| anyhow!(e))?),
                None => SearchFilter::default(),
            };

            let hits = match (like, tensor) {
                (Some(atom), _) => {
                    engine.search_like(&AtomId::new(atom), k, Some(&weighting), filter)?
                }
                (None, Some(spec)) => {
                    let values = engine.partial_tensor_query(&parse_tensor(&spec)?, fill)?;
                    let query = HybridQuery::tensor(values).with_filter(filter);
                    engine.search(&query, k, Some(&weighting))?
                }
                (None, None) => bail!("search needs --like or --tensor"),
            };
            print_json(&hits)
        }
        Command::Neighbors { atom, kind } => {
            let kind = kind
                .map(|k| k.parse::<RelationshipType>().map_err(|e| anyhow!(e)))
                .transpose()?;
            print_json(&engine.neighbors(&AtomId::new(atom), kind)?)
        }
        Command::Path { from, to, max_depth } => {
            let path = engine.find_path(&AtomId::new(from), &AtomId::new(to), max_depth, None)?;
            print_json(&path)
        }
        Command::Snapshot { dir } => {
            let manager = SnapshotManager::new(&dir)?;
            let description = manager.create_snapshot(
                "atomx",
                engine.store().tensor_schema().dimensions(),
                &engine.export_dataset(),
            )?;
            print_json(&description)
        }
        Command::Show { atom } => {
            let id = AtomId::new(atom);
            let record = engine.get_atom(&id)?;
            let tensor = engine
                .get_tensor(&id)
                .ok()
                .map(|t| t.to_map(engine.store().tensor_schema()));
            print_json(&serde_json::json!({
                "atom": record.as_ref(),
                "tensor": tensor,
                "goldilocks": engine.get_goldilocks(&id, None, None)?,
                "outgoing": engine.neighbors(&id, None)?,
                "incoming": engine.graph().incoming(&id, None)?,
            }))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting atomx v{}", env!("CARGO_PKG_VERSION"));
    run(args)
}
