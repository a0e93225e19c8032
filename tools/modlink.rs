//! modlink - inspect the unit registry of a module tree
//!
//! Discovers `unit.toml` manifests under the configured module roots and
//! answers scope, order and link questions for a consumer.
//!
//! Usage:
//!   modlink [--config <file>] [--root <dir>]... <command>

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use modlink::unit::fetch::{fetch_remotes, GitFetcher};
use modlink::unit::registry::UnitDiscovery;
use modlink::utils::{env_or_default, init_logging, init_logging_from_config};
use modlink::{ArtifactLayout, Consumer, ModlinkConfig, Registry, Resolver, ScopeFilter};

#[cfg(not(target_os = "windows"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Picked up from the working directory when neither --config nor MODLINK_CONFIG is given
const DEFAULT_CONFIG: &str = "modlink.toml";

#[derive(Parser, Debug)]
#[command(name = "modlink", version, about = "Library-unit registry and build ordering")]
struct Args {
    /// Configuration file (TOML, or JSON by extension); defaults to $MODLINK_CONFIG or ./modlink.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Additional module root, relative to the base directory (repeatable)
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Log filter, e.g. "debug" or "modlink::unit=trace"
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every registered unit and whether it is built
    List,
    /// Units visible from the module roots
    Visible {
        /// Leave this unit out of its own scope
        #[arg(long)]
        exclude_self: Option<String>,
    },
    /// Build order of a unit and its transitive dependencies
    Resolve {
        name: String,
        /// Print only the dependencies, not the unit itself
        #[arg(long)]
        deps_only: bool,
    },
    /// Search paths and link inputs for a consumer
    Plan {
        /// Registered unit acting as the consumer
        #[arg(long)]
        consumer: Option<String>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clone the remotes declared by discovered manifests and register them
    Fetch,
}

fn load_config(args: &Args) -> anyhow::Result<ModlinkConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(env_or_default("MODLINK_CONFIG", DEFAULT_CONFIG)))
            .filter(|p| p.is_file()),
    };
    let mut config = match &path {
        Some(path) => ModlinkConfig::load(path)
            .with_context(|| format!("failed to load configuration from {:?}", path))?,
        None => ModlinkConfig::default(),
    };
    config.apply_env_overrides();
    config
        .module_roots
        .extend(args.roots.iter().map(|r| r.to_string_lossy().into_owned()));
    Ok(config)
}

fn module_roots(config: &ModlinkConfig, base_dir: &Path) -> Vec<PathBuf> {
    config
        .module_roots
        .iter()
        .map(|root| base_dir.join(root))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match (&args.log, &config.logging) {
        (Some(filter), _) => init_logging(Some(filter.as_str())),
        (None, logging) => init_logging_from_config(logging.as_ref()),
    }

    let base_dir = config.base_dir();
    let roots = module_roots(&config, &base_dir);
    let layout = ArtifactLayout::from_config(&config.artifacts, &base_dir);
    debug!("Module roots: {:?}", roots);

    let discovery = UnitDiscovery::new()
        .skip_dir(layout.build_root())
        .skip_dir(base_dir.join(&config.fetch.checkout_dir));
    let mut registry = Registry::with_policy(config.registration);
    let registered = discovery.register_all(&mut registry, &roots)?;
    let built = registry.refresh_artifacts(&layout);
    info!("Registered {} units, {} built", registered.len(), built);

    match args.command {
        Command::List => {
            for unit in registry.units() {
                let state = if unit.artifact_ready() { "built" } else { "not built" };
                println!("{}\t{}\t{}", unit.name, state, unit.source_root.display());
            }
        }
        Command::Visible { exclude_self } => {
            let visible = ScopeFilter::new(&registry, &base_dir)
                .with_core_runtime(config.core_runtime_name())
                .visible_units(&config.module_roots, exclude_self.as_deref());
            for name in visible {
                println!("{}", name);
            }
        }
        Command::Resolve { name, deps_only } => {
            let resolver = Resolver::new(&registry);
            let order = if deps_only {
                resolver.resolve_dependencies(&name)?
            } else {
                resolver.resolve(&name)?
            };
            for unit in order {
                println!("{}", unit);
            }
        }
        Command::Plan { consumer, json } => {
            let mut planner = Consumer::from_config(&registry, &config);
            if let Some(name) = consumer {
                planner = planner.named(name);
            }
            let plan = planner.plan()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                for (unit, path) in plan.link_units.iter().zip(&plan.search_paths) {
                    println!("{}\t{}", unit, path.display());
                }
            }
        }
        Command::Fetch => {
            let remotes: Vec<_> = discovery
                .discover(&roots)
                .into_iter()
                .flat_map(|unit| unit.manifest.remotes)
                .collect();
            let fetcher = GitFetcher::from_config(&config.fetch, &base_dir);
            for name in fetch_remotes(&fetcher, &mut registry, &remotes).await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
