use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC002",
    default_severity: Severity::Block,
    title: "child_process usage",
    description: "Spawning processes from extension code is not permitted.",
    remediation: "Use the host platform APIs instead of child_process.",
    docs_url: None,
};

const MODULE: &str = "child_process";
const METHODS: &[&str] = &[
    "exec",
    "execSync",
    "execFile",
    "execFileSync",
    "spawn",
    "spawnSync",
    "fork",
];

/// Flags any import or require of `child_process` plus member calls of its
/// spawn family through a recorded alias. A renamed named import
/// (`import { exec as e }`) fires at the import; the call to the renamed
/// binding cannot be attributed without type information.
pub struct Sec002;

impl SourceRule for Sec002 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_import(&self, decl: &ImportDeclaration<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_module_specifier(decl.source.value.as_str(), MODULE) {
            ctx.report(&META, decl.span, "import of child_process");
        }
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        if let Some(specifier) = matchers::require_argument(call) {
            if matchers::is_module_specifier(specifier, MODULE) {
                ctx.report(&META, call.span, "require of child_process");
                return;
            }
        }
        if matchers::is_member_call(call, MODULE, METHODS, ctx.aliases) {
            let method = matchers::static_member_call(call)
                .map(|(_, method)| method)
                .unwrap_or("?");
            ctx.report(&META, call.span, format!("call to child_process.{method}()"));
        }
    }
}
