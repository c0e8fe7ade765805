//! dnrc-gen: CLI tool for compiling EasyList filter lists into declarative rules.

use clap::{Parser, Subcommand};
use dnrc::cache::{is_stale, CacheStore, FileCacheStore};
use dnrc::compiler::{compile_parsed, merge};
use dnrc::converter::parse_list;
use dnrc::{BlocklistConfig, BlocklistManager, Limits, Status};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dnrc-gen")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Compile EasyList filter lists into declarative network rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile local filter list files into rules.json and hide.css
    Compile {
        /// Input filter list files, merged in the given order
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Maximum number of rules
        #[arg(long, default_value_t = dnrc::config::DEFAULT_MAX_RULES)]
        max_rules: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore cached rules and refresh them if stale
    Refresh {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Refresh even if the cache is fresh
        #[arg(short, long)]
        force: bool,
    },

    /// Print the cached blocklist status as JSON
    Status {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Keep rules fresh until interrupted
    Watch {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            input,
            output_dir,
            max_rules,
            verbose,
        } => compile_files(&input, &output_dir, max_rules, verbose),
        Commands::Refresh { config, force } => refresh(config.as_deref(), force).await,
        Commands::Status { config } => status(config.as_deref()),
        Commands::Watch { config } => watch(config.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> dnrc::Result<BlocklistConfig> {
    match path {
        Some(path) => BlocklistConfig::load(path),
        None => Ok(BlocklistConfig::default()),
    }
}

fn compile_files(
    inputs: &[PathBuf],
    output_dir: &Path,
    max_rules: usize,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let limits = Limits {
        max_rules,
        ..Limits::default()
    };

    let mut lists = Vec::with_capacity(inputs.len());
    for input in inputs {
        if verbose {
            println!("Reading filter list: {:?}", input);
        }
        let text = fs::read_to_string(input)?;
        let parsed = parse_list(&text, limits.max_hide_selectors);
        if verbose {
            let stats = parsed.stats;
            println!(
                "  {} lines: {} domain, {} pattern, {} path, {} selectors",
                stats.lines,
                parsed.domain_rules.len(),
                parsed.pattern_rules.len(),
                parsed.path_rules.len(),
                parsed.hide_selectors.len()
            );
            println!(
                "  skipped: {} comments, {} exceptions, {} cosmetic, {} procedural, {} domain-scoped, {} unsupported",
                stats.comments,
                stats.exceptions,
                stats.cosmetic + stats.unsupported_selectors,
                stats.procedural,
                stats.domain_scoped,
                stats.unsupported
            );
        }
        lists.push(compile_parsed(parsed, &limits));
    }

    let artifact = merge(lists, &limits);

    fs::create_dir_all(output_dir)?;
    let rules_path = output_dir.join("rules.json");
    let css_path = output_dir.join("hide.css");
    fs::write(&rules_path, serde_json::to_string_pretty(&artifact.rules)?)?;
    fs::write(&css_path, &artifact.hide_css)?;

    println!(
        "Generated {:?} ({} rules) and {:?} ({} bytes)",
        rules_path,
        artifact.rule_count(),
        css_path,
        artifact.hide_css.len()
    );
    Ok(())
}

async fn refresh(config: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let manager = BlocklistManager::from_config(load_config(config)?)?;
    let outcome = manager.init().await;

    if outcome.restored > 0 {
        println!("Restored {} cached rules", outcome.restored);
    }

    let result = match outcome.refresh {
        Some(result) => Some(result),
        None if force => Some(manager.refresh().await),
        None => None,
    };

    match result {
        Some(Ok(report)) => println!(
            "Refreshed: {} rules from {} lists ({} failed)",
            report.rule_count, report.sources_ok, report.sources_failed
        ),
        Some(Err(e)) => return Err(e.into()),
        None => println!("Cache is fresh, nothing to do"),
    }

    print_status(&manager.status())
}

fn status(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let store = FileCacheStore::new(&config.cache_dir);
    let record = store.load()?;

    print_status(&Status::from_record(&record))?;

    if is_stale(record.last_updated, config.refresh_interval()) {
        println!("Cache is stale");
    }
    Ok(())
}

async fn watch(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let manager = BlocklistManager::from_config(load_config(config)?)?;

    if let Some(Err(e)) = manager.init().await.refresh {
        log::warn!("Startup refresh failed: {}", e);
    }
    manager.schedule_periodic_refresh();
    print_status(&manager.status())?;

    tokio::signal::ctrl_c().await?;
    manager.stop_periodic_refresh();
    println!("Stopped");
    Ok(())
}

fn print_status(status: &Status) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(status)?);
    Ok(())
}
