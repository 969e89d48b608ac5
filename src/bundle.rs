use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{SecurityConfig, is_trusted_domain, security_config};
use crate::matchers;
use crate::report::{Finding, ScanReport, Severity, line_col, line_snippet};

/// Checks a regex cannot express, applied to each raw match before it
/// becomes a finding.
#[derive(Debug, Clone, Copy)]
enum PostFilter {
    /// Keep the match only when the URL host is outside the trusted list.
    UntrustedUrlHost,
}

impl PostFilter {
    fn keep(self, matched: &str, cfg: &SecurityConfig) -> bool {
        match self {
            PostFilter::UntrustedUrlHost => matchers::url_host(matched)
                .map(|host| !is_trusted_domain(&host, cfg))
                .unwrap_or(true),
        }
    }
}

/// A bundle-mode rule over the minified artifact text. When
/// `signal_patterns` is non-empty, at least one signal must match before any
/// pattern is evaluated; a missing signal short-circuits the rule to zero
/// findings. `regex::Regex` keeps no cursor state, so the precompiled
/// patterns are safely reused across artifacts.
pub struct BundleRule {
    pub id: &'static str,
    pub severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub source_rule_id: &'static str,
    patterns: Vec<Regex>,
    signal_patterns: Vec<Regex>,
    post_filter: Option<PostFilter>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static BUNDLE_RULES: Lazy<Vec<BundleRule>> = Lazy::new(build_rules);

/// The active bundle rule set, in evaluation order.
pub fn bundle_rules() -> &'static [BundleRule] {
    &BUNDLE_RULES
}

fn build_rules() -> Vec<BundleRule> {
    vec![
        BundleRule {
            id: "SEC101",
            severity: Severity::Block,
            title: "dynamic code evaluation in bundle",
            description: "eval/new Function survive minification under their own names.",
            source_rule_id: "SEC001",
            patterns: compile(&[
                // Leading [^.\w] keeps obj.eval out; globalThis.eval has its
                // own spelling below.
                r"(?:^|[^.\w])eval\s*\(",
                r"\bnew\s+Function\s*\(",
                r"globalThis\s*\.\s*eval\b",
                r#"globalThis\s*\[\s*["']eval["']\s*\]"#,
                // eval hidden behind hex escapes in a string.
                r"\\x65\\x76\\x61\\x6c",
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
        BundleRule {
            id: "SEC102",
            severity: Severity::Block,
            title: "child_process usage in bundle",
            description: "Process spawning reached the deployment artifact.",
            source_rule_id: "SEC002",
            patterns: compile(&[
                r"\b(?:execFileSync|execFile|execSync|exec|spawnSync|spawn|fork)\s*\(",
                r#"\[\s*["'](?:execFileSync|execFile|execSync|exec|spawnSync|spawn|fork)["']\s*\]\s*\("#,
            ]),
            signal_patterns: compile(&[
                r#"require\s*\(\s*["'](?:node:)?child_process["']\s*\)"#,
                r#"__require\s*\(\s*["'](?:node:)?child_process["']\s*\)"#,
                r"require_child_process\s*\(",
                r#"from\s*["'](?:node:)?child_process["']"#,
                r#"\[\s*["'](?:node:)?child_process["']\s*\]"#,
            ]),
            post_filter: None,
        },
        BundleRule {
            id: "SEC103",
            severity: Severity::Block,
            title: "vm module usage in bundle",
            description: "vm context execution reached the deployment artifact.",
            source_rule_id: "SEC003",
            patterns: compile(&[
                r"\b(?:runInNewContext|runInThisContext|runInContext|createContext)\s*\(",
                r"new\s+[A-Za-z_$][\w$]*\s*\.\s*Script\s*\(",
            ]),
            signal_patterns: compile(&[
                r#"require\s*\(\s*["'](?:node:)?vm["']\s*\)"#,
                r#"__require\s*\(\s*["'](?:node:)?vm["']\s*\)"#,
                r"require_vm\s*\(",
                r#"from\s*["'](?:node:)?vm["']"#,
            ]),
            post_filter: None,
        },
        BundleRule {
            id: "SEC105",
            severity: Severity::Block,
            title: "native addon loading in bundle",
            description: "Native addon loaders reached the deployment artifact.",
            source_rule_id: "SEC005",
            patterns: compile(&[
                r#"(?:require|__require)\s*\(\s*["'][^"']*\.node["']\s*\)"#,
                r#"(?:require|__require)\s*\(\s*["'](?:node-gyp-build|bindings|ffi-napi|ref-napi|node-addon-api|node-pre-gyp)["']\s*\)"#,
                r#"from\s*["'](?:node-gyp-build|bindings|ffi-napi|ref-napi|node-addon-api|node-pre-gyp)["']"#,
                r"process\s*\.\s*dlopen",
                r#"process\s*\[\s*["']dlopen["']\s*\]"#,
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
        BundleRule {
            id: "SEC106",
            severity: Severity::Block,
            title: "module loader tampering in bundle",
            description: "Module/require.cache patching reached the deployment artifact.",
            source_rule_id: "SEC006",
            patterns: compile(&[
                r"Module\s*\.\s*_load\s*=",
                r#"Module\s*\[\s*["']_load["']\s*\]\s*="#,
                r"Module\s*\.\s*_resolveFilename\s*=",
                r#"Module\s*\[\s*["']_resolveFilename["']\s*\]\s*="#,
                r"Module\s*\.\s*_extensions\s*\[",
                r"require\s*\.\s*cache\s*\[",
                r"delete\s+require\s*\.\s*cache",
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
        BundleRule {
            id: "SEC107",
            severity: Severity::Block,
            title: "inspector usage in bundle",
            description: "The inspector protocol reached the deployment artifact.",
            source_rule_id: "SEC007",
            patterns: compile(&[
                r#"(?:require|__require)\s*\(\s*["'](?:node:)?inspector["']\s*\)"#,
                r#"from\s*["'](?:node:)?inspector["']"#,
                r"require_inspector\s*\(",
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
        BundleRule {
            id: "SEC108",
            severity: Severity::Warn,
            title: "external URL in bundle",
            description: "Network endpoint outside the trusted domain list.",
            source_rule_id: "SEC008",
            patterns: compile(&[r#"https?://[^\s"'`)]+"#]),
            signal_patterns: Vec::new(),
            post_filter: Some(PostFilter::UntrustedUrlHost),
        },
        BundleRule {
            id: "SEC109",
            severity: Severity::Warn,
            title: "large encoded blob in bundle",
            description: "Oversized base64/hex literal fed to a decoder.",
            source_rule_id: "SEC009",
            patterns: compile(&[
                r#"Buffer\s*\.\s*from\s*\(\s*["'][A-Za-z0-9+/=]{201,}["']\s*,\s*["'](?:base64|hex)["']"#,
                r#"atob\s*\(\s*["'][A-Za-z0-9+/=]{201,}["']"#,
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
        BundleRule {
            id: "SEC110",
            severity: Severity::Warn,
            title: "sensitive operation in bundle",
            description: "Credential store or system password file reference.",
            source_rule_id: "SEC010",
            // Single alternation so overlapping spellings of one path yield
            // one finding per position.
            patterns: compile(&[
                r"(?:~/\.ssh|/etc/passwd|/etc/shadow|/var/run/secrets|/\.ssh/|/\.aws/credentials|/\.env\b)",
            ]),
            signal_patterns: Vec::new(),
            post_filter: None,
        },
    ]
}

/// Scan the bundled artifact. Read failure is fatal: the gate cannot decide
/// on an artifact it cannot inspect.
pub fn scan_bundle(artifact: &Path) -> Result<ScanReport> {
    let text = fs::read_to_string(artifact)
        .with_context(|| format!("failed to read artifact: {}", artifact.display()))?;
    let findings = scan_text(&text, artifact, security_config());
    Ok(ScanReport::from_findings(findings, 1))
}

/// Two-pass signal+pattern scan over artifact text. Every distinct match
/// position of every pattern yields one finding; matches of different rules
/// are independent.
pub(crate) fn scan_text(text: &str, artifact: &Path, cfg: &SecurityConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in bundle_rules() {
        if !rule.signal_patterns.is_empty()
            && !rule.signal_patterns.iter().any(|signal| signal.is_match(text))
        {
            continue;
        }
        for pattern in &rule.patterns {
            for matched in pattern.find_iter(text) {
                if let Some(filter) = rule.post_filter {
                    if !filter.keep(matched.as_str(), cfg) {
                        continue;
                    }
                }
                let (line, col) = line_col(text, matched.start());
                findings.push(Finding {
                    rule_id: rule.id.to_string(),
                    severity: rule.severity,
                    message: format!("{}: `{}`", rule.title, truncate(matched.as_str(), 80)),
                    file: artifact.display().to_string(),
                    line,
                    col,
                    snippet: line_snippet(text, matched.start()),
                });
            }
        }
    }
    findings
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Finding> {
        scan_text(text, Path::new("bundle.js"), security_config())
    }

    fn ids(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.rule_id.as_str()).collect()
    }

    #[test]
    fn signal_gates_child_process_patterns() {
        // Signal present: the exec( pattern fires.
        let hot = scan(r#"const cp = require("node:child_process"); exec("ls")"#);
        assert_eq!(ids(&hot), vec!["SEC102"]);

        // No signal: `execute(` alone stays silent.
        let cold = scan("function execute(){return 42;}");
        assert!(cold.is_empty());
    }

    #[test]
    fn bundler_wrappers_count_as_signals() {
        let wrapped = scan(r#"var cp = require_child_process(); cp.spawnSync("id")"#);
        assert_eq!(ids(&wrapped), vec!["SEC102"]);

        let rolled = scan(r#"var cp = __require("child_process"); fork("./w")"#);
        assert_eq!(ids(&rolled), vec!["SEC102"]);
    }

    #[test]
    fn each_match_position_is_a_finding() {
        let findings = scan(r#"require("child_process"); exec("a"); spawn("b")"#);
        assert_eq!(ids(&findings), vec!["SEC102", "SEC102"]);
        assert_ne!(
            (findings[0].line, findings[0].col),
            (findings[1].line, findings[1].col)
        );
    }

    #[test]
    fn eval_patterns_fire_without_a_signal() {
        let findings = scan(r#"eval(atob("payload"))"#);
        assert_eq!(ids(&findings), vec!["SEC101"]);
        assert_eq!(findings[0].severity, Severity::Block);
    }

    #[test]
    fn member_eval_is_not_flagged_but_globalthis_is() {
        assert!(scan("logger.eval(x)").is_empty());
        assert_eq!(ids(&scan("globalThis.eval(x)")), vec!["SEC101"]);
        assert_eq!(ids(&scan(r#"globalThis["eval"](x)"#)), vec!["SEC101"]);
    }

    #[test]
    fn hex_escaped_eval_is_flagged() {
        let findings = scan(r#"const k = "\x65\x76\x61\x6c"; g[k](p)"#);
        assert_eq!(ids(&findings), vec!["SEC101"]);
    }

    #[test]
    fn vm_requires_its_signal() {
        assert!(scan("createContext({})").is_empty());
        let findings = scan(r#"var vm = require("vm"); vm.runInNewContext(src)"#);
        assert_eq!(ids(&findings), vec!["SEC103"]);
    }

    #[test]
    fn native_addon_patterns() {
        let findings = scan(r#"var a = require("./build/addon.node"); process.dlopen(m, p)"#);
        assert_eq!(ids(&findings), vec!["SEC105", "SEC105"]);
    }

    #[test]
    fn loader_tampering_patterns() {
        let findings = scan(r#"Module._load = h; require.cache[k] = f"#);
        assert_eq!(ids(&findings), vec!["SEC106", "SEC106"]);
    }

    #[test]
    fn inspector_require() {
        let findings = scan(r#"var insp = require("node:inspector")"#);
        assert_eq!(ids(&findings), vec!["SEC107"]);
    }

    #[test]
    fn urls_filtered_by_trusted_host() {
        let findings = scan(
            r#"fetch("https://api.godaddy.com/v1"); fetch("https://collect.evil.example/x")"#,
        );
        assert_eq!(ids(&findings), vec!["SEC108"]);
        assert!(findings[0].message.contains("collect.evil.example"));
        assert_eq!(findings[0].severity, Severity::Warn);
    }

    #[test]
    fn encoded_blob_boundary() {
        let short = format!(r#"Buffer.from("{}", "base64")"#, "A".repeat(200));
        assert!(scan(&short).is_empty());

        let long = format!(r#"Buffer.from("{}", "base64")"#, "A".repeat(201));
        assert_eq!(ids(&scan(&long)), vec!["SEC109"]);

        let hex = format!(r#"Buffer.from("{}", "hex")"#, "f".repeat(300));
        assert_eq!(ids(&scan(&hex)), vec!["SEC109"]);
    }

    #[test]
    fn sensitive_paths_yield_one_finding_per_position() {
        let findings = scan(r#"fs.readFileSync("~/.ssh/id_rsa"); open("/etc/shadow")"#);
        assert_eq!(ids(&findings), vec!["SEC110", "SEC110"]);
    }

    #[test]
    fn patterns_are_stateless_across_inputs() {
        let hit = r#"require("child_process"); exec("ls")"#;
        let miss = "function execute(){}";

        // Interleave scans; a stateful matcher would carry its cursor over.
        let first = scan(hit);
        let _ = scan(miss);
        let second = scan(hit);

        assert_eq!(ids(&first), ids(&second));
        assert_eq!(
            (first[0].line, first[0].col),
            (second[0].line, second[0].col)
        );
    }

    #[test]
    fn every_bundle_rule_pairs_with_a_source_rule() {
        for rule in bundle_rules() {
            assert!(rule.id.starts_with("SEC1"));
            assert!(rule.source_rule_id.starts_with("SEC0"));
            assert_eq!(&rule.id[4..], &rule.source_rule_id[4..]);
        }
    }
}
