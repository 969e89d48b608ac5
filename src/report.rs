use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Severity of a finding. Only `Block` denies deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Off,
    Warn,
    Block,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Off => write!(f, "off"),
            Severity::Warn => write!(f, "warn"),
            Severity::Block => write!(f, "block"),
        }
    }
}

/// A single security finding. Coordinates are 1-indexed. Immutable once emitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub col: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeverityCounts {
    pub off: usize,
    pub warn: usize,
    pub block: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub by_rule_id: BTreeMap<String, usize>,
    pub by_severity: SeverityCounts,
}

/// Unified scan result across source, scripts, and bundle modes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub findings: Vec<Finding>,
    pub blocked: bool,
    pub summary: Summary,
    pub scanned_files: usize,
}

impl ScanReport {
    /// The only constructor: the summary is always derived from the findings,
    /// so `summary.total == findings.len()` and `blocked` cannot drift.
    pub fn from_findings(findings: Vec<Finding>, scanned_files: usize) -> Self {
        let mut by_rule_id: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_severity = SeverityCounts::default();

        for finding in &findings {
            *by_rule_id.entry(finding.rule_id.clone()).or_insert(0) += 1;
            match finding.severity {
                Severity::Off => by_severity.off += 1,
                Severity::Warn => by_severity.warn += 1,
                Severity::Block => by_severity.block += 1,
            }
        }

        let blocked = by_severity.block > 0;
        let summary = Summary {
            total: findings.len(),
            by_rule_id,
            by_severity,
        };

        ScanReport {
            findings,
            blocked,
            summary,
            scanned_files,
        }
    }

    /// Concatenate several reports, preserving the order findings were
    /// produced in (source, scripts, bundle for a gate run).
    pub fn merge(reports: Vec<ScanReport>) -> Self {
        let mut findings = Vec::new();
        let mut scanned_files = 0;
        for report in reports {
            scanned_files += report.scanned_files;
            findings.extend(report.findings);
        }
        ScanReport::from_findings(findings, scanned_files)
    }
}

/// Compute 1-indexed line and column for a byte offset into `text`.
pub(crate) fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let capped = offset.min(text.len());
    let prefix = &text[..capped];
    let line = prefix.bytes().filter(|b| *b == b'\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(idx) => capped - idx,
        None => capped + 1,
    };
    (line, col)
}

/// The source line containing `offset`, trimmed, for use as a snippet.
pub(crate) fn line_snippet(text: &str, offset: usize) -> Option<String> {
    let capped = offset.min(text.len());
    let start = text[..capped].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[capped..]
        .find('\n')
        .map(|i| capped + i)
        .unwrap_or(text.len());
    let line = text[start..end].trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

pub(crate) fn print_human_report(report: &ScanReport) {
    for finding in &report.findings {
        println!(
            "{}:{}:{} [{} {}] {}",
            finding.file,
            finding.line,
            finding.col,
            finding.rule_id,
            finding.severity,
            finding.message
        );
    }

    println!("\nSummary:");
    println!("  - Scanned files: {}", report.scanned_files);
    println!("  - Findings: {}", report.summary.total);
    println!("  - Block: {}", report.summary.by_severity.block);
    println!("  - Warn: {}", report.summary.by_severity.warn);
    if !report.summary.by_rule_id.is_empty() {
        println!("  - By rule:");
        for (rule_id, count) in &report.summary.by_rule_id {
            println!("      {rule_id}: {count}");
        }
    }
    println!("  - Blocked: {}", report.blocked);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule_id: &str, severity: Severity) -> Finding {
        Finding {
            rule_id: rule_id.to_string(),
            severity,
            message: "test".to_string(),
            file: "a.ts".to_string(),
            line: 1,
            col: 1,
            snippet: None,
        }
    }

    #[test]
    fn summary_total_matches_findings() {
        let report = ScanReport::from_findings(
            vec![
                finding("SEC001", Severity::Block),
                finding("SEC008", Severity::Warn),
                finding("SEC008", Severity::Warn),
            ],
            4,
        );

        assert_eq!(report.summary.total, report.findings.len());
        assert_eq!(report.summary.by_rule_id["SEC001"], 1);
        assert_eq!(report.summary.by_rule_id["SEC008"], 2);
        assert_eq!(report.summary.by_severity.block, 1);
        assert_eq!(report.summary.by_severity.warn, 2);
        assert_eq!(report.scanned_files, 4);
    }

    #[test]
    fn blocked_iff_block_finding_present() {
        let clean = ScanReport::from_findings(vec![finding("SEC008", Severity::Warn)], 1);
        assert!(!clean.blocked);

        let blocked = ScanReport::from_findings(
            vec![
                finding("SEC008", Severity::Warn),
                finding("SEC002", Severity::Block),
            ],
            1,
        );
        assert!(blocked.blocked);
        assert!(blocked.summary.by_severity.block > 0);
    }

    #[test]
    fn merge_preserves_order_and_recomputes_summary() {
        let first = ScanReport::from_findings(vec![finding("SEC001", Severity::Block)], 2);
        let second = ScanReport::from_findings(vec![finding("SEC011", Severity::Warn)], 1);

        let merged = ScanReport::merge(vec![first, second]);
        assert_eq!(merged.findings[0].rule_id, "SEC001");
        assert_eq!(merged.findings[1].rule_id, "SEC011");
        assert_eq!(merged.summary.total, 2);
        assert_eq!(merged.scanned_files, 3);
        assert!(merged.blocked);
    }

    #[test]
    fn line_col_is_one_indexed() {
        let text = "abc\ndef\nghi";
        assert_eq!(line_col(text, 0), (1, 1));
        assert_eq!(line_col(text, 2), (1, 3));
        assert_eq!(line_col(text, 4), (2, 1));
        assert_eq!(line_col(text, 9), (3, 2));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Off < Severity::Warn);
        assert!(Severity::Warn < Severity::Block);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Block).unwrap(),
            "\"block\""
        );
    }

    #[test]
    fn finding_wire_format_is_camel_case() {
        let value = serde_json::to_value(finding("SEC001", Severity::Block)).unwrap();
        assert_eq!(value["ruleId"], "SEC001");
        assert_eq!(value["severity"], "block");
        assert!(value.get("snippet").is_none());
    }
}
