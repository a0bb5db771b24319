//! Command-line interface for the incident schema pipeline
//!
//! Three subcommands over a directory of extracted incident JSON:
//! `convert-schema` (coerce and write normalized copies), `schema-check`
//! (strict validation with a non-zero exit when anything is invalid), and
//! `quality-gate` (corpus quality metrics).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::model::Config;
use crate::service::batch::{self, BatchError};

#[derive(Parser)]
#[command(
    name = "bowtie-intel",
    version,
    about = "Incident Schema v2.3 normalization and validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize extracted incident JSON to conform to Schema v2.3
    ConvertSchema(ConvertSchemaArgs),
    /// Validate extracted incident JSON against Schema v2.3
    SchemaCheck(SchemaCheckArgs),
    /// Report quality metrics over structured incident JSON
    QualityGate(QualityGateArgs),
}

#[derive(Args)]
pub struct ConvertSchemaArgs {
    /// Source directory with extracted JSON files
    #[arg(long)]
    pub incident_dir: PathBuf,

    /// Destination directory for normalized JSON
    #[arg(long)]
    pub out_dir: PathBuf,
}

#[derive(Args)]
pub struct SchemaCheckArgs {
    /// Directory with extracted JSON files (defaults to the configured path)
    #[arg(long)]
    pub incident_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct QualityGateArgs {
    /// Directory with extracted JSON files (defaults to the configured path)
    #[arg(long)]
    pub incident_dir: Option<PathBuf>,
}

/// Dispatch a parsed command line
pub fn run(cli: Cli, config: &Config) -> ExitCode {
    match cli.command {
        Command::ConvertSchema(args) => run_convert_schema(&args.incident_dir, &args.out_dir),
        Command::SchemaCheck(args) => {
            let dir = args
                .incident_dir
                .unwrap_or_else(|| config.paths.incident_dir.clone());
            run_schema_check(&dir)
        }
        Command::QualityGate(args) => {
            let dir = args
                .incident_dir
                .unwrap_or_else(|| config.paths.incident_dir.clone());
            run_quality_gate(&dir)
        }
    }
}

fn run_convert_schema(incident_dir: &Path, out_dir: &Path) -> ExitCode {
    match batch::convert_directory(incident_dir, out_dir) {
        Ok(summary) => {
            if summary.converted == 0 && summary.skipped == 0 {
                tracing::warn!(path = %incident_dir.display(), "No JSON files found");
                return ExitCode::SUCCESS;
            }
            tracing::info!(
                "Converted {} files -> {}",
                summary.converted,
                out_dir.display()
            );
            if summary.skipped > 0 {
                tracing::warn!("Skipped {} undecodable files", summary.skipped);
            }
            if !summary.tally.is_empty() {
                tracing::info!("Coercion summary:");
                for (rule, count) in summary.tally.by_frequency() {
                    tracing::info!("  {rule}: {count}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(BatchError::MissingDir(path)) => {
            tracing::warn!(path = %path.display(), "Incident directory not found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "convert-schema failed");
            ExitCode::FAILURE
        }
    }
}

fn run_schema_check(incident_dir: &Path) -> ExitCode {
    match batch::check_directory(incident_dir) {
        Ok(summary) => {
            if summary.total == 0 {
                tracing::warn!(path = %incident_dir.display(), "No JSON files found");
                return ExitCode::SUCCESS;
            }
            tracing::info!(
                "Schema check: {}/{} valid in {}",
                summary.valid_count(),
                summary.total,
                incident_dir.display()
            );
            for (path, errors) in &summary.invalid {
                tracing::error!("Invalid: {} ({} errors)", path.display(), errors.len());
                for err in errors.iter().take(5) {
                    tracing::error!("  - {err}");
                }
            }
            if summary.all_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(BatchError::MissingDir(path)) => {
            tracing::warn!(path = %path.display(), "Incident directory not found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "schema-check failed");
            ExitCode::FAILURE
        }
    }
}

fn run_quality_gate(incident_dir: &Path) -> ExitCode {
    match batch::quality_gate(incident_dir) {
        Ok(gate) => {
            match serde_json::to_string_pretty(&gate) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode gate metrics");
                    return ExitCode::FAILURE;
                }
            }
            tracing::info!(
                "Quality gate: {} incidents, {}% with controls, {}% with summary",
                gate.total,
                gate.has_controls_pct,
                gate.has_summary_pct
            );
            ExitCode::SUCCESS
        }
        Err(BatchError::MissingDir(path)) => {
            tracing::warn!(path = %path.display(), "Incident directory not found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "quality-gate failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_schema_args() {
        let cli = Cli::parse_from([
            "bowtie-intel",
            "convert-schema",
            "--incident-dir",
            "in",
            "--out-dir",
            "out",
        ]);
        match cli.command {
            Command::ConvertSchema(args) => {
                assert_eq!(args.incident_dir, PathBuf::from("in"));
                assert_eq!(args.out_dir, PathBuf::from("out"));
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_schema_check_dir_is_optional() {
        let cli = Cli::parse_from(["bowtie-intel", "schema-check"]);
        match cli.command {
            Command::SchemaCheck(args) => assert!(args.incident_dir.is_none()),
            _ => panic!("wrong command"),
        }
    }
}
