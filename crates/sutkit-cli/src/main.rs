//! sutkit - runbook tooling
//!
//! ## Commands
//!
//! - `validate`: check a runbook's structure and its platform section
//! - `plan`: resolve every case against the declared environments

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sutkit_baremetal::BareMetalPlatformConfig;
use sutkit_core::telemetry::init_tracing;
use sutkit_core::{CasePlan, NodeSpace, Runbook};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "sutkit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Match test requirements to environments and plan runs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a runbook is well formed
    Validate {
        /// Path to the runbook (JSON)
        runbook: PathBuf,
    },

    /// Show which environment each case would run on
    Plan {
        /// Path to the runbook (JSON)
        runbook: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Exit non-zero when any case has no environment
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Validate { runbook } => {
            let summary = cmd_validate(&runbook)?;
            println!("{summary}");
            Ok(())
        }
        Commands::Plan {
            runbook,
            format,
            strict,
        } => cmd_plan(&runbook, format, strict),
    }
}

fn load(path: &Path) -> Result<Runbook> {
    Runbook::from_path(path).with_context(|| format!("Failed to load runbook {}", path.display()))
}

fn cmd_validate(path: &Path) -> Result<String> {
    let runbook = load(path)?;
    runbook
        .validate()
        .with_context(|| format!("Runbook {} is invalid", path.display()))?;

    let clusters = match &runbook.platform {
        Some(platform) => {
            let config = BareMetalPlatformConfig::from_value(Some(platform))
                .context("Invalid platform section")?;
            config.cluster.len()
        }
        None => 0,
    };

    info!(
        runbook = %runbook.name,
        environments = runbook.environments.len(),
        cases = runbook.cases.len(),
        "runbook validated"
    );
    Ok(format!(
        "Runbook '{}' is valid: {} environment(s), {} case(s), {} cluster(s)",
        runbook.name,
        runbook.environments.len(),
        runbook.cases.len(),
        clusters
    ))
}

fn cmd_plan(path: &Path, format: Format, strict: bool) -> Result<()> {
    let runbook = load(path)?;
    runbook
        .validate()
        .with_context(|| format!("Runbook {} is invalid", path.display()))?;
    let plan = runbook.plan();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        Format::Text => println!("{}", render_plan_text(&plan)),
    }

    let unavailable = plan.iter().filter(|p| !p.is_matched()).count();
    if strict && unavailable > 0 {
        bail!("{unavailable} case(s) have no environment");
    }
    Ok(())
}

fn render_node(node: &NodeSpace) -> String {
    let mut parts = Vec::new();
    if let Some(cores) = node.core_count.as_ref().and_then(|c| c.current) {
        parts.push(format!("cores={cores}"));
    }
    if let Some(memory) = node.memory_mb.as_ref().and_then(|m| m.current) {
        parts.push(format!("memory_mb={memory}"));
    }
    if let Some(path) = node.current_data_path() {
        parts.push(format!("data_path={path:?}"));
    }
    if !node.features.is_empty() {
        let names: Vec<&str> = node.features.keys().map(String::as_str).collect();
        parts.push(format!("features={}", names.join(",")));
    }
    if parts.is_empty() {
        "any".to_string()
    } else {
        parts.join(" ")
    }
}

fn render_plan_text(plan: &[CasePlan]) -> String {
    let matched = plan.iter().filter(|p| p.is_matched()).count();
    let mut out = String::new();
    out.push_str("Plan\n");
    out.push_str("====\n");
    let _ = writeln!(out, "matched: {matched}");
    let _ = writeln!(out, "unavailable: {}", plan.len() - matched);

    for entry in plan {
        match entry {
            CasePlan::Matched { case, environment } => {
                let _ = writeln!(out, "\n  + {case} -> {}", environment.name);
                for (index, node) in environment.nodes().iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "      node[{index}] <- candidate node[{}]: {}",
                        environment.node_assignment[index],
                        render_node(node)
                    );
                }
            }
            CasePlan::Unavailable { case, reasons } => {
                let _ = writeln!(out, "\n  - {case}: no environment");
                for reason in reasons {
                    let _ = writeln!(out, "      {reason}");
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNBOOK: &str = r#"{
        "name": "nightly",
        "environments": [{
            "name": "rack-a",
            "nodes": [{ "core_count": { "min": 8, "max": 64 } }]
        }],
        "cases": [
            { "name": "smoke", "requirement": { "nodes": [{ "core_count": { "min": 16 } }] } },
            { "name": "huge", "requirement": { "nodes": [{ "core_count": { "min": 128 } }] } }
        ],
        "platform": {
            "cluster": [{
                "connection": { "address": "10.1.0.2", "username": "admin" },
                "client": [{ "management_port": 1, "connection": { "address": "10.1.0.20", "username": "root" } }]
            }]
        }
    }"#;

    fn runbook_file(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runbook.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_validate_reports_counts() {
        let (_dir, path) = runbook_file(RUNBOOK);
        let summary = cmd_validate(&path).unwrap();
        assert_eq!(
            summary,
            "Runbook 'nightly' is valid: 1 environment(s), 2 case(s), 1 cluster(s)"
        );
    }

    #[test]
    fn test_validate_rejects_bad_platform_section() {
        let (_dir, path) = runbook_file(
            r#"{ "environments": [{}], "platform": { "cluster": [{ "client": [{}] }] } }"#,
        );
        let err = cmd_validate(&path).unwrap_err();
        assert_eq!(err.to_string(), "Invalid platform section");
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = cmd_validate(Path::new("/nonexistent/runbook.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/runbook.json"));
    }

    #[test]
    fn test_plan_text_lists_both_outcomes() {
        let runbook = Runbook::from_json_str(RUNBOOK).unwrap();
        let text = render_plan_text(&runbook.plan());
        assert!(text.contains("matched: 1"));
        assert!(text.contains("unavailable: 1"));
        assert!(text.contains("+ smoke -> rack-a"));
        assert!(text.contains("node[0] <- candidate node[0]: cores=16"));
        assert!(text.contains("- huge: no environment"));
    }

    #[test]
    fn test_strict_plan_fails_on_unavailable_case() {
        let (_dir, path) = runbook_file(RUNBOOK);
        assert!(cmd_plan(&path, Format::Json, false).is_ok());
        let err = cmd_plan(&path, Format::Text, true).unwrap_err();
        assert_eq!(err.to_string(), "1 case(s) have no environment");
    }

    #[test]
    fn test_cli_parses_plan_flags() {
        let cli = Cli::try_parse_from(["sutkit", "--verbose", "plan", "rb.json", "--format", "json"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Plan { format, strict, .. } => {
                assert_eq!(format, Format::Json);
                assert!(!strict);
            }
            Commands::Validate { .. } => panic!("expected plan"),
        }
    }
}
