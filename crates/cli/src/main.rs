use anyhow::{bail, Context, Result};
use capcard_facts::{aggregate, Extractor, FactBase, Finding};
use capcard_module_graph::{GraphBuilder, ReachabilityWalker, WalkerConfig};
use capcard_protocol::{CapabilityCard, CardSchema};
use capcard_synth::{HttpCompletionService, HttpServiceConfig, Synthesizer};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod loader;
mod output;

use config::RunConfig;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "capcard")]
#[command(about = "Derive a capability card from an agent's source code", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory containing the agent's source tree
    agent_dir: PathBuf,

    /// Entry file, relative to the agent directory
    #[arg(long, default_value = "agent.py")]
    entry: String,

    /// Directory to save the generated cards
    #[arg(short, long, default_value = "./cards")]
    output_dir: PathBuf,

    /// Card serialization format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Run configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Card schema definition (JSON); built-in schema when omitted
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Completion model identifier (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the completion API (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum reachability depth; unbounded when omitted
    #[arg(long)]
    max_depth: Option<usize>,

    /// Repair attempts after the initial draft (overrides config)
    #[arg(long)]
    max_repairs: Option<u32>,

    /// Print the aggregated fact base as JSON and skip synthesis
    #[arg(long)]
    facts_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(max_repairs) = cli.max_repairs {
        config.synthesis.max_repair_attempts = max_repairs;
    }

    let facts = analyze(&cli, &config)?;
    log::info!("Fact base holds {} finding(s)", facts.len());

    if cli.facts_only {
        println!("{}", serde_json::to_string_pretty(&facts)?);
        return Ok(());
    }

    let card = synthesize(&cli, &config, &facts)?;
    output::write_card(&card, &cli.output_dir, cli.format)?;
    Ok(())
}

/// Static half of the pipeline: load → graph → reachability → facts
fn analyze(cli: &Cli, config: &RunConfig) -> Result<FactBase> {
    let files = loader::load_source_tree(&cli.agent_dir)?;
    if files.is_empty() {
        bail!("no Python files found under {}", cli.agent_dir.display());
    }

    let graph = GraphBuilder::new()
        .context("initializing parser")?
        .build(&files, &cli.entry)
        .context("building module graph")?;
    for warning in &graph.warnings {
        log::warn!("Excluded from analysis: {warning}");
    }

    let walker = ReachabilityWalker::new(WalkerConfig {
        max_depth: cli.max_depth,
    });
    let reachable = walker.walk(&graph);
    log::info!(
        "{} definition(s) reachable from {}, {} unresolved call site(s)",
        reachable.len(),
        cli.entry,
        reachable.unresolved().len()
    );

    let extractor = Extractor::new(&config.extractor).context("configuring extractor")?;
    let mut findings: Vec<Finding> = reachable
        .definitions(&graph)
        .flat_map(|(node, def)| extractor.extract(&node.path, def))
        .collect();
    findings.extend(reachable.unresolved().iter().map(|u| {
        Finding::unresolved(&u.module_path, &u.definition, &u.expression, u.line)
    }));

    Ok(aggregate(findings))
}

/// Generative half: prompt → completion service → validate/repair
fn synthesize(cli: &Cli, config: &RunConfig, facts: &FactBase) -> Result<CapabilityCard> {
    let schema = match &cli.schema {
        Some(path) => CardSchema::from_json_file(path)
            .with_context(|| format!("loading schema {}", path.display()))?,
        None => CardSchema::default(),
    };

    let api_key = std::env::var("CAPCARD_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("set CAPCARD_API_KEY or OPENAI_API_KEY (or use --facts-only)")?;

    let service = HttpCompletionService::new(HttpServiceConfig {
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        api_key,
        timeout: Duration::from_secs(config.timeout_secs),
    })
    .context("building completion client")?;

    let synthesizer = Synthesizer::new(service, schema, config.synthesis.clone())
        .context("configuring synthesizer")?;

    log::info!("Requesting card synthesis from {}", config.model);
    let card = synthesizer
        .synthesize(facts)
        .context("card synthesis failed")?;
    Ok(card)
}
