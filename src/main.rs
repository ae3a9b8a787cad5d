//! Quickbridge conformance host
//!
//! Runs the built-in bridge scenarios against a fresh environment each and
//! reports pass/fail. Any failed scenario, or an exception still pending when
//! a scenario returns, exits with status 1.

mod scenarios;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quickbridge::{BridgeConfig, Env, ThisCoercion, VERSION};
use regex::Regex;
use scenarios::{describe_exception, Scenario, SCENARIOS};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quickbridge")]
#[command(author, version, about = "Conformance host for the Quickbridge native-interface bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run conformance scenarios (all of them by default)
    Run {
        /// Only run scenarios whose name matches this pattern (repeatable)
        #[arg(short, long, value_name = "PATTERN")]
        scenario: Vec<String>,

        /// Receiver binding rule: sloppy, object-required or passthrough
        #[arg(long, value_name = "MODE")]
        this_coercion: Option<ThisCoercion>,

        /// Bridge configuration file (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// List the built-in scenarios
    List,
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let outcome = match cli.command.unwrap_or(Commands::Run {
        scenario: Vec::new(),
        this_coercion: None,
        config: None,
    }) {
        Commands::Run {
            scenario,
            this_coercion,
            config,
        } => run(&scenario, this_coercion, config),
        Commands::List => {
            list();
            Ok(true)
        }
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn list() {
    println!("Quickbridge v{} scenarios:", VERSION);
    for scenario in SCENARIOS {
        println!("  {:<20} {}", scenario.name, scenario.description);
    }
}

fn load_config(path: Option<PathBuf>, this_coercion: Option<ThisCoercion>) -> Result<BridgeConfig> {
    let config = match path {
        Some(path) => BridgeConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    Ok(match this_coercion {
        Some(mode) => config.with_this_coercion(mode),
        None => config,
    })
}

fn select(patterns: &[String]) -> Result<Vec<&'static Scenario>> {
    if patterns.is_empty() {
        return Ok(SCENARIOS.iter().collect());
    }
    let filters = patterns
        .iter()
        .map(|pattern| Regex::new(pattern).with_context(|| format!("invalid scenario pattern '{}'", pattern)))
        .collect::<Result<Vec<_>>>()?;
    Ok(SCENARIOS
        .iter()
        .filter(|scenario| filters.iter().any(|filter| filter.is_match(scenario.name)))
        .collect())
}

fn run(patterns: &[String], this_coercion: Option<ThisCoercion>, config: Option<PathBuf>) -> Result<bool> {
    let config = load_config(config, this_coercion)?;
    let selected = select(patterns)?;
    if selected.is_empty() {
        anyhow::bail!("no scenario matches the given patterns");
    }
    info!(count = selected.len(), this_coercion = ?config.this_coercion, "running scenarios");

    let start = Instant::now();
    let mut failed = 0;
    for scenario in &selected {
        let mut env = Env::with_config(config.clone());
        match run_scenario(&mut env, scenario) {
            Ok(()) => println!("  ✓ {}", scenario.name),
            Err(e) => {
                failed += 1;
                println!("  ✗ {}: {:#}", scenario.name, e);
            }
        }
    }

    println!();
    println!(
        "{} passed, {} failed ({:.2?})",
        selected.len() - failed,
        failed,
        start.elapsed()
    );
    Ok(failed == 0)
}

fn run_scenario(env: &mut Env, scenario: &Scenario) -> Result<()> {
    debug!(scenario = scenario.name, "start");
    let scope = env.open_handle_scope()?;
    let result = (scenario.run)(env);
    env.close_handle_scope(scope);
    result?;
    if let Some(exception) = env.get_and_clear_last_exception() {
        anyhow::bail!("uncaught exception: {}", describe_exception(env, exception));
    }
    Ok(())
}
