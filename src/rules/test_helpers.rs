use std::path::Path;

use crate::config::security_config;
use crate::engine::{ScanOptions, scan_file};
use crate::report::Finding;

use super::default_rules;

pub(crate) fn scan_source(source: &str) -> Vec<Finding> {
    scan_named("src/extension.ts", source)
}

pub(crate) fn scan_named(path: &str, source: &str) -> Vec<Finding> {
    let rules = default_rules();
    let scan = scan_file(
        Path::new(path),
        source,
        &rules,
        security_config(),
        &ScanOptions::default(),
    );
    assert!(scan.parsed, "fixture failed to parse");
    scan.findings
}

pub(crate) fn rule_ids(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|f| f.rule_id.as_str()).collect()
}
