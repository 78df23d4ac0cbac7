//! Blockplan CLI
//!
//! Validates and repacks files destined for a fixed flash block region
//!
//! Exit status: 0 on success (invalid or unplaceable files are reported,
//! not failures), 2 for a bad region or block size, 1 for anything else.

use anyhow::{Context, Result};
use blockplan::source::{describe_paths, descriptors};
use blockplan::{AddressPolicy, PlanConfig, PlanError, PlanReport, Planner, PlannerBuilder};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blockplan")]
#[command(about = "Check and repack block placements declared in file names")]
struct Cli {
    /// Log per-file decisions (adds a debug directive to RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate declared placements and print the block map
    Check(PlanArgs),
    /// Propose a first-fit repacking
    Pack(PlanArgs),
    /// Run both the check and the repacking
    Plan(PlanArgs),
    /// Repack and copy placeable files to a directory under their new names
    Export {
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        plan: PlanArgs,
    },
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First allocatable block
    #[arg(long)]
    start: Option<u64>,

    /// Last allocatable block (inclusive)
    #[arg(long)]
    end: Option<u64>,

    /// Bytes per block
    #[arg(long)]
    block_size: Option<u64>,

    /// Use this block for names without a block number instead of failing
    #[arg(long, value_name = "BLOCK")]
    substitute_malformed: Option<u64>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Input files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl PlanArgs {
    /// Config file values with command line overrides applied
    fn config(&self) -> Result<PlanConfig> {
        let mut config = match &self.config {
            Some(path) => PlanConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PlanConfig::default(),
        };

        if let Some(start) = self.start {
            config.start_block = start;
        }
        if let Some(end) = self.end {
            config.end_block = end;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(block) = self.substitute_malformed {
            config.on_malformed = AddressPolicy::Substitute(block);
        }
        Ok(config)
    }

    fn planner(&self) -> Result<Planner> {
        let config = self.config()?;
        PlannerBuilder::new()
            .config(&config)
            .build()
            .context("invalid block region")
    }
}

fn print_report(report: &PlanReport, format: Format) -> Result<()> {
    match format {
        Format::Text => print!("{}", report),
        Format::Json => println!("{}", report.to_json()?),
    }
    if report.has_problems() {
        warn!("Some files are invalid or could not be placed");
    }
    Ok(())
}

fn run(command: Command) -> Result<()> {
    let (args, mode) = match command {
        Command::Check(args) => (args, Mode::Check),
        Command::Pack(args) => (args, Mode::Pack),
        Command::Plan(args) => (args, Mode::Plan),
        Command::Export { out, plan } => (plan, Mode::Export(out)),
    };

    // Region errors surface before any file is touched.
    let planner = args.planner()?;
    let sources = describe_paths(&args.files).context("reading input files")?;
    let files = descriptors(&sources);

    match mode {
        Mode::Check => {
            let outcome = planner.check(files)?;
            let report = PlanReport::new(planner.geometry()).with_validation(&outcome);
            print_report(&report, args.format)?;
        }
        Mode::Pack => {
            let packing = planner.pack(files)?;
            let report = PlanReport::new(planner.geometry()).with_packing(&packing);
            print_report(&report, args.format)?;
        }
        Mode::Plan => {
            let plan = planner.plan(files)?;
            print_report(&planner.report(&plan), args.format)?;
        }
        Mode::Export(dir) => {
            let plan = planner.plan(files)?;
            print_report(&planner.report(&plan), args.format)?;

            match planner
                .export(&plan.packing, &sources, &dir)
                .with_context(|| format!("exporting to {}", dir.display()))?
            {
                Some(manifest) => info!(
                    "Exported {} files to {}",
                    manifest.entries.len(),
                    dir.display()
                ),
                None => eprintln!("No files could be placed; nothing exported."),
            }
        }
    }
    Ok(())
}

enum Mode {
    Check,
    Pack,
    Plan,
    Export(PathBuf),
}

/// Log filter: `RUST_LOG` when set, `info` otherwise; `-v` adds `debug`
fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let filter = EnvFilter::new(rust_log.unwrap_or("info"));
    if verbose {
        filter.add_directive(Level::DEBUG.into())
    } else {
        filter
    }
}

/// 2 for configuration errors, 1 for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PlanError>() {
        Some(plan_err) if plan_err.is_configuration() => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(rust_log.as_deref(), cli.verbose))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_is_not_overridden() {
        let filter = log_filter(Some("warn"), false);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(log_filter(None, false).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(None, true).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            log_filter(Some("warn"), true).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn test_exit_code_for_configuration_errors() {
        let err = anyhow::Error::from(PlanError::RangeOverflow { end: u64::MAX })
            .context("invalid block region");
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(PlanError::MalformedAddress {
            name: "logo.icl".into(),
        });
        assert_eq!(exit_code(&err), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("reading input files")), 1);
    }

    #[test]
    fn test_cli_parses_export() {
        let cli = Cli::try_parse_from(["blockplan", "export", "-o", "out", "--end", "40", "32_a.icl"])
            .unwrap();
        match cli.command {
            Command::Export { out, plan } => {
                assert_eq!(out, PathBuf::from("out"));
                assert_eq!(plan.end, Some(40));
                assert_eq!(plan.config().unwrap().end_block, 40);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
