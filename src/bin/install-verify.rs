use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use install_verify::config::{load_config, Overrides};
use install_verify::expected::load_local;
use install_verify::orchestrator::verify_host;
use install_verify::preflight::check_host_tools;
use install_verify::report::Report;
use install_verify::{CheckId, VerifyError};

/// Verify a freshly installed host against its expected state
#[derive(Parser)]
#[command(name = "install-verify")]
#[command(about = "Verify a freshly installed host against its expected state", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// More log output (repeat for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the expected state from the target and run the checks
    Run {
        /// Config file (default: <config dir>/install-verify/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Target host (overrides [target].host)
        #[arg(long)]
        host: Option<String>,

        /// SSH user (overrides [target].user)
        #[arg(long)]
        user: Option<String>,

        /// Check to run; repeat for several (overrides [verify].checks)
        #[arg(long = "check", value_name = "NAME")]
        checks: Vec<String>,

        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List every known check
    Checks,

    /// Parse and validate a local snapshot without contacting a host
    Validate {
        /// Snapshot file
        snapshot: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            host,
            user,
            checks,
            json,
        } => run(
            config.as_deref(),
            Overrides {
                host,
                user,
                checks,
            },
            json,
        ),
        Commands::Checks => {
            list_checks();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { snapshot } => validate(&snapshot),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<VerifyError>()
                .map_or(2, VerifyError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn run(config: Option<&Path>, overrides: Overrides, json: bool) -> Result<ExitCode> {
    check_host_tools()?;
    let config = load_config(config, &overrides)?;
    let host = config.target.host.clone();
    info!(host = %host, "verifying");

    let outcome = verify_host(config.target, &config.options)?;
    let report = Report::new(&host, outcome);

    if json {
        println!("{}", report.to_json().context("serializing report")?);
    } else {
        print!("{}", report.render_table());
    }

    Ok(if report.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn list_checks() {
    let width = CheckId::ALL
        .iter()
        .map(|check| check.name().len())
        .max()
        .unwrap_or(0);
    for check in CheckId::ALL {
        println!("{:<width$}  {}", check.name(), check.summary(), width = width);
    }
}

fn validate(path: &Path) -> Result<ExitCode> {
    let loaded = load_local(path).map_err(|e| match e {
        install_verify::LoadError::Spec(spec) => anyhow::Error::new(VerifyError::from(spec)),
        other => anyhow::Error::new(other),
    })
    .with_context(|| format!("validating snapshot '{}'", path.display()))?;

    println!("{}: valid (sha256 {})", path.display(), loaded.sha256);
    let names = CheckId::applicable(&loaded.state)
        .into_iter()
        .map(CheckId::name)
        .collect::<Vec<_>>();
    println!("applicable checks: {}", names.join(", "));
    Ok(ExitCode::SUCCESS)
}
