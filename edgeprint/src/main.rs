#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use edgeprint_lib::{load_from_path, telemetry, Analyzer, Config, DomainReport};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "CDN and edge server fingerprinting across every IP of a site")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "EDGEPRINT_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON reports
    #[arg(short, long)]
    pretty: bool,

    /// Targets to analyze: https://host[:port][/path], http://... or a bare host
    #[arg(required = true, value_name = "TARGET")]
    targets: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_from_path(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("failed to load configuration: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Err(err) = telemetry::init_tracing(&config.logging.level, config.logging.show_target) {
        eprintln!("{err}");
    }
    info!(config = ?cli.config, targets = cli.targets.len(), "configuration loaded");

    let analyzer = match Analyzer::new(&config) {
        Ok(analyzer) => analyzer,
        Err(err) => {
            error!(%err, "failed to initialize analyzer");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        code = run(&analyzer, &cli.targets, cli.pretty) => code,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            ExitCode::from(130)
        }
    }
}

async fn run(analyzer: &Analyzer, targets: &[String], pretty: bool) -> ExitCode {
    let mut code = ExitCode::SUCCESS;

    for target in targets {
        match analyzer.analyze(target).await {
            Ok(report) => {
                if let Err(err) = print_report(&report, pretty) {
                    error!(%err, "failed to write report");
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => {
                error!(%err, input = %target, "analysis failed");
                code = ExitCode::FAILURE;
            }
        }
    }

    code
}

fn print_report(
    report: &DomainReport,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}
