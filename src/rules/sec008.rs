use oxc_span::Span;

use crate::config::is_trusted_domain;
use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC008",
    default_severity: Severity::Warn,
    title: "external URL",
    description: "Network endpoints outside the trusted domain list.",
    remediation: "Route traffic through trusted platform domains.",
    docs_url: None,
};

/// Warns on every string or substitution-free template literal whose URL
/// host is outside the trusted domain list. Templates with substitutions
/// never reach this handler, so dynamic URLs are under-approximated.
pub struct Sec008;

impl SourceRule for Sec008 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_string_literal(&self, value: &str, span: Span, ctx: &mut RuleContext<'_>) {
        if !matchers::matches_url(value) {
            return;
        }
        let Some(host) = matchers::url_host(value) else {
            return;
        };
        if !is_trusted_domain(&host, ctx.config) {
            ctx.report(
                &META,
                span,
                format!("external URL host `{host}` is not trusted"),
            );
        }
    }
}
