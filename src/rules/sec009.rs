use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC009",
    default_severity: Severity::Warn,
    title: "large encoded blob",
    description: "Oversized base64/hex literals routinely hide second-stage payloads.",
    remediation: "Ship data as reviewable plain source or fetch it from a trusted domain.",
    docs_url: None,
};

// Literals of exactly this length are allowed; one more byte is flagged.
const MAX_LITERAL_LEN: usize = 200;

/// Warns on `Buffer.from(lit, "base64"|"hex")` and `atob(lit)` where the
/// decoded literal is longer than 200 characters.
pub struct Sec009;

impl SourceRule for Sec009 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        let decoder = if matchers::is_buffer_from_call(call, Some("base64")) {
            Some("Buffer.from(.., \"base64\")")
        } else if matchers::is_buffer_from_call(call, Some("hex")) {
            Some("Buffer.from(.., \"hex\")")
        } else if matchers::is_call_to_global(call, "atob") {
            Some("atob(..)")
        } else {
            None
        };
        let Some(decoder) = decoder else {
            return;
        };

        let Some(literal) = call.arguments.first().and_then(matchers::argument_string_value)
        else {
            return;
        };
        if literal.len() > MAX_LITERAL_LEN {
            ctx.report(
                &META,
                call.span,
                format!("{decoder} decodes a {} character literal", literal.len()),
            );
        }
    }
}
