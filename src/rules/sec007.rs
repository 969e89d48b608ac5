use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC007",
    default_severity: Severity::Block,
    title: "inspector module usage",
    description: "The inspector protocol can attach to and control the host process.",
    remediation: "Remove the inspector dependency.",
    docs_url: None,
};

const MODULE: &str = "inspector";

/// Flags any import or require of `inspector`.
pub struct Sec007;

impl SourceRule for Sec007 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_import(&self, decl: &ImportDeclaration<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_module_specifier(decl.source.value.as_str(), MODULE) {
            ctx.report(&META, decl.span, "import of inspector");
        }
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        if let Some(specifier) = matchers::require_argument(call) {
            if matchers::is_module_specifier(specifier, MODULE) {
                ctx.report(&META, call.span, "require of inspector");
            }
        }
    }
}
