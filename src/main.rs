use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depsentry::{
    config::Config,
    manifest::{detect_ecosystem, discover_local, discover_remote, is_remote, DefaultFetcher},
    output::{format_report, print_result, OutputFormat},
    registry::HttpRegistryClient,
    scan::{ScanOptions, Scanner},
    Ecosystem, ManifestFiles, ScanReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const FINDINGS: u8 = 2;
}

#[derive(Parser)]
#[command(name = "depsentry")]
#[command(
    author,
    version,
    about = "Flag dependencies that were removed or unpublished from their registry"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory, manifest file, or GitHub repository
    Scan {
        /// Local path, manifest URL, GitHub repository URL, or GitHub search URL
        target: String,

        /// Ecosystem to scan (npm, ruby, python); repeatable. Detected when omitted
        #[arg(short, long)]
        ecosystem: Vec<String>,

        /// Scan every configured ecosystem that has manifests
        #[arg(long, conflicts_with = "ecosystem")]
        all: bool,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write a JSON report to file
        #[arg(short, long)]
        output: Option<String>,

        /// Maximum registry lookups in flight
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Per-lookup timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Exit with code 2 if any finding is reported
        #[arg(long)]
        fail_on_findings: bool,
    },

    /// List supported ecosystems
    ListEcosystems,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

struct ScanArgs {
    target: String,
    ecosystems: Vec<String>,
    all: bool,
    format: String,
    output: Option<String>,
    fail_on_findings: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Scan {
            target,
            ecosystem,
            all,
            format,
            output,
            max_concurrent,
            timeout,
            fail_on_findings,
        } => {
            if let Some(max) = max_concurrent {
                config.max_concurrent_requests = max;
            }
            if let Some(secs) = timeout {
                config.request_timeout_secs = secs;
            }

            let args = ScanArgs {
                target,
                ecosystems: ecosystem,
                all,
                format: format.unwrap_or(config.default_format.clone()),
                output,
                fail_on_findings,
            };
            run_scan(&config, args).await
        }
        Commands::ListEcosystems => {
            list_ecosystems();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(config: &Config, args: ScanArgs) -> Result<u8> {
    let format = OutputFormat::from_str(&args.format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let client = reqwest::Client::builder()
        .user_agent(concat!("depsentry/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout())
        .build()?;

    let files = discover(&client, &args.target, is_interactive).await?;
    let selection = select_ecosystems(config, &args, &files)?;

    if selection.is_empty() {
        eprintln!("No supported ecosystem detected in {}", args.target);
        return Ok(exit_codes::SUCCESS);
    }

    let names: Vec<&str> = selection.iter().map(Ecosystem::as_str).collect();
    info!("Scanning {} for {}", args.target, names.join(", "));

    let scanner = Scanner::new(
        Arc::new(HttpRegistryClient::with_timeout(config.request_timeout())),
        Arc::new(DefaultFetcher::with_client(client)),
        ScanOptions::from(config),
    );

    let mut handle = scanner.start(&selection, files);

    let progress = if is_interactive {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Reading manifests...");
        Some(pb)
    } else {
        None
    };

    while let Some(event) = handle.progress.recv().await {
        if let Some(ref pb) = progress {
            pb.set_length(event.total as u64);
            pb.set_position(event.scanned as u64);
            pb.set_message(format!("Checking registries ({:.0}%)", event.percent()));
        }
    }

    let outcome = handle.finish().await?;

    if let Some(pb) = progress {
        pb.finish_with_message(format!(
            "Checked {} dependencies, {} findings",
            outcome.scanned,
            outcome.findings.len()
        ));
    }

    let has_findings = outcome.has_findings();
    let report = ScanReport::new(args.target, selection, outcome);

    if let Some(path) = args.output {
        std::fs::write(&path, format_report(&report)?)
            .with_context(|| format!("Failed to write report to {}", path))?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&report, format)?;
    }

    if args.fail_on_findings && has_findings {
        Ok(exit_codes::FINDINGS)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

async fn discover(
    client: &reqwest::Client,
    target: &str,
    is_interactive: bool,
) -> Result<ManifestFiles> {
    let spinner = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Locating manifest files...");
        Some(pb)
    } else {
        None
    };

    let files = if is_remote(target) {
        discover_remote(client, target).await
    } else {
        let path = Path::new(target);
        if !path.exists() {
            anyhow::bail!("Target not found: {}", target);
        }
        discover_local(path)
    };

    if let Some(pb) = spinner {
        pb.finish_with_message(format!("Found {} manifest files", files.len()));
    }

    Ok(files)
}

fn select_ecosystems(
    config: &Config,
    args: &ScanArgs,
    files: &ManifestFiles,
) -> Result<Vec<Ecosystem>> {
    if !args.ecosystems.is_empty() {
        let mut selection = Vec::new();
        for name in &args.ecosystems {
            let ecosystem = Ecosystem::from_str(name).map_err(|e| anyhow::anyhow!(e))?;
            if !selection.contains(&ecosystem) {
                selection.push(ecosystem);
            }
        }
        return Ok(selection);
    }

    if args.all {
        return Ok(config
            .default_ecosystems
            .iter()
            .copied()
            .filter(|e| files.has(*e))
            .collect());
    }

    Ok(detect_ecosystem(&args.target, files).into_iter().collect())
}

fn list_ecosystems() {
    println!("Supported ecosystems:");
    println!();

    let config = Config::load().unwrap_or_default();
    for ecosystem in Ecosystem::ALL {
        println!(
            "  {:<8} {:<10} {}",
            ecosystem.as_str(),
            ecosystem.display_name(),
            ecosystem.manifest_names()
        );
        println!(
            "  {:<8} Registry: {}",
            "",
            config.registries.lookup_url(ecosystem, "<name>")
        );
        println!();
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'depsentry config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
