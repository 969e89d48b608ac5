use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::bundle::scan_bundle;
use crate::config::security_config;
use crate::engine::{ScanOptions, internal_finding, scan_tree};
use crate::report::ScanReport;
use crate::rules::default_rules;
use crate::scripts::scan_scripts;

/// Terminal gate decision. `proceed` is false exactly when the merged report
/// is blocked (or the binary maps a fatal scan error to deny-by-default).
pub struct GateOutcome {
    pub proceed: bool,
    pub report: ScanReport,
}

/// Run the full gate over an extension directory and its bundled artifact:
/// source scan, lifecycle-scripts scan, bundle scan, merged in that order.
/// When the report is blocked the artifact and its sourcemap (default
/// `<artifact>.map`) are deleted best-effort and deployment is refused.
///
/// Fatal errors — nonexistent extension root, unreadable artifact — return
/// `Err`; callers treat them as deny-by-default. A missing or malformed
/// manifest is recoverable and surfaces as an internal warn finding.
pub fn gate(ext_dir: &Path, artifact: &Path, sourcemap: Option<&Path>) -> Result<GateOutcome> {
    let cfg = security_config();
    let rules = default_rules();
    let options = ScanOptions::default();

    let source_report = scan_tree(ext_dir, &rules, cfg, &options)?;

    let manifest = ext_dir.join("package.json");
    let script_findings = match scan_scripts(&manifest) {
        Ok(findings) => findings,
        Err(err) => vec![internal_finding(
            &manifest,
            format!("scripts scan failed: {err:#}"),
        )],
    };
    let scripts_report = ScanReport::from_findings(script_findings, 0);

    let bundle_report = scan_bundle(artifact)?;

    let report = ScanReport::merge(vec![source_report, scripts_report, bundle_report]);

    if report.blocked {
        let _ = fs::remove_file(artifact);
        let map = sourcemap
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sibling_sourcemap(artifact));
        let _ = fs::remove_file(map);
        return Ok(GateOutcome {
            proceed: false,
            report,
        });
    }

    Ok(GateOutcome {
        proceed: true,
        report,
    })
}

fn sibling_sourcemap(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".map");
    artifact.with_file_name(name)
}
