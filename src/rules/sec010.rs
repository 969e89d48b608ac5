use oxc_span::Span;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC010",
    default_severity: Severity::Warn,
    title: "sensitive path reference",
    description: "References to credential stores and system password files.",
    remediation: "Extensions have no business reading these paths.",
    docs_url: None,
};

/// Warns on literals that mention well-known credential or secret locations
/// (`~/.ssh`, `/etc/passwd`, `/.aws/credentials`, ...).
pub struct Sec010;

impl SourceRule for Sec010 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_string_literal(&self, value: &str, span: Span, ctx: &mut RuleContext<'_>) {
        if let Some(marker) = matchers::sensitive_path_marker(value) {
            ctx.report(&META, span, format!("reference to sensitive path `{marker}`"));
        }
    }
}
