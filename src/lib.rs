use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod aliases;
mod bundle;
mod config;
mod discovery;
mod engine;
mod gate;
mod matchers;
mod report;
mod rules;
mod scripts;

pub use aliases::AliasMaps;
pub use bundle::{BundleRule, bundle_rules, scan_bundle};
pub use config::{SecurityConfig, is_trusted_domain, security_config, should_exclude_file};
pub use discovery::collect_source_files;
pub use engine::{FileScan, RuleContext, RuleMeta, ScanOptions, SourceRule, scan_file, scan_tree};
pub use gate::{GateOutcome, gate};
pub use report::{Finding, ScanReport, Severity, Summary};
pub use rules::default_rules;
pub use scripts::scan_scripts;

#[derive(Parser, Debug)]
#[command(name = "extguard")]
#[command(about = "Scan third-party extension source and bundled artifacts for security violations")]
struct Cli {
    /// Extension root directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Bundled artifact to scan; enables the deployment gate
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Sourcemap deleted alongside a blocked artifact (defaults to <artifact>.map)
    #[arg(long)]
    sourcemap: Option<PathBuf>,

    /// Emit JSON output
    #[arg(long)]
    json: bool,
}

/// CLI entry. Returns whether deployment may proceed; scan errors bubble up
/// and are treated as deny-by-default by the binary.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();

    let (report, proceed) = if let Some(artifact) = &cli.artifact {
        let outcome = gate::gate(&cli.root, artifact, cli.sourcemap.as_deref())?;
        (outcome.report, outcome.proceed)
    } else {
        let cfg = security_config();
        let source_rules = rules::default_rules();
        let source_report =
            engine::scan_tree(&cli.root, &source_rules, cfg, &engine::ScanOptions::default())?;

        let manifest = cli.root.join("package.json");
        let script_findings = match scripts::scan_scripts(&manifest) {
            Ok(findings) => findings,
            Err(err) => vec![engine::internal_finding(
                &manifest,
                format!("scripts scan failed: {err:#}"),
            )],
        };
        let report = ScanReport::merge(vec![
            source_report,
            ScanReport::from_findings(script_findings, 0),
        ]);
        let proceed = !report.blocked;
        (report, proceed)
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_human_report(&report);
    }

    Ok(proceed)
}
