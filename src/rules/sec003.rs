use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC003",
    default_severity: Severity::Block,
    title: "vm module usage",
    description: "The vm module compiles and runs code in fresh contexts.",
    remediation: "Remove vm usage; extensions may not execute generated code.",
    docs_url: None,
};

const MODULE: &str = "vm";
const METHODS: &[&str] = &[
    "runInContext",
    "runInNewContext",
    "runInThisContext",
    "createContext",
];

/// Flags any import or require of `vm`, its context-execution methods
/// through a recorded alias, and `new <alias>.Script(...)`.
pub struct Sec003;

impl SourceRule for Sec003 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_import(&self, decl: &ImportDeclaration<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_module_specifier(decl.source.value.as_str(), MODULE) {
            ctx.report(&META, decl.span, "import of vm");
        }
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        if let Some(specifier) = matchers::require_argument(call) {
            if matchers::is_module_specifier(specifier, MODULE) {
                ctx.report(&META, call.span, "require of vm");
                return;
            }
        }
        if matchers::is_member_call(call, MODULE, METHODS, ctx.aliases) {
            let method = matchers::static_member_call(call)
                .map(|(_, method)| method)
                .unwrap_or("?");
            ctx.report(&META, call.span, format!("call to vm.{method}()"));
        }
    }

    fn on_new(&self, expr: &NewExpression<'_>, ctx: &mut RuleContext<'_>) {
        let Expression::StaticMemberExpression(member) = &expr.callee else {
            return;
        };
        if member.property.name.as_str() != "Script" {
            return;
        }
        let Expression::Identifier(object) = &member.object else {
            return;
        };
        if matchers::module_alias_names(ctx.aliases, MODULE).contains(object.name.as_str()) {
            ctx.report(&META, expr.span, "script compilation via new vm.Script()");
        }
    }
}
