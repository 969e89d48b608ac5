use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC001",
    default_severity: Severity::Block,
    title: "dynamic code evaluation",
    description: "eval() and new Function() execute arbitrary strings as code.",
    remediation: "Remove dynamic code evaluation; ship the logic as regular source.",
    docs_url: None,
};

/// Flags `eval(...)` and `new Function(...)`. A locally declared `Function`
/// class shadowing the global cannot be told apart without type information;
/// that false positive is accepted.
pub struct Sec001;

impl SourceRule for Sec001 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_call_to_global(call, "eval") {
            ctx.report(&META, call.span, "call to eval()");
        }
    }

    fn on_new(&self, expr: &NewExpression<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_new_expression_of(expr, "Function") {
            ctx.report(&META, expr.span, "dynamic code via new Function()");
        }
    }
}
