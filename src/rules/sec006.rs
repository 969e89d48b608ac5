use oxc_ast::ast::*;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC006",
    default_severity: Severity::Block,
    title: "module loader tampering",
    description: "Patching Module internals or require.cache hijacks every later import.",
    remediation: "Do not monkey-patch the module loader.",
    docs_url: None,
};

// Prefixes of member paths that rewire module resolution. Literal bracket
// keys are folded by `member_path`, so `Module["_load"]` is covered.
const TAMPER_PREFIXES: &[&str] = &[
    "Module._load",
    "Module._resolveFilename",
    "Module._extensions",
    "require.cache",
];

fn tampered_path(path: &str) -> bool {
    TAMPER_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn assignment_target_path(target: &AssignmentTarget<'_>) -> Option<String> {
    match target {
        AssignmentTarget::StaticMemberExpression(member) => {
            matchers::member_path(&member.object)
                .map(|base| format!("{base}.{}", member.property.name))
        }
        AssignmentTarget::ComputedMemberExpression(member) => {
            let base = matchers::member_path(&member.object)?;
            match matchers::string_literal_value(&member.expression) {
                Some(key) => Some(format!("{base}.{key}")),
                None => Some(format!("{base}[..]")),
            }
        }
        _ => None,
    }
}

/// Flags writes to `Module._load`, `Module._resolveFilename`,
/// `Module._extensions[...]`, and writes to or deletes of
/// `require.cache[...]`, in dot or bracket notation.
pub struct Sec006;

impl SourceRule for Sec006 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_assignment(&self, expr: &AssignmentExpression<'_>, ctx: &mut RuleContext<'_>) {
        if let Some(path) = assignment_target_path(&expr.left) {
            if tampered_path(&path) {
                ctx.report(&META, expr.span, format!("assignment to {path}"));
            }
        }
    }

    fn on_unary(&self, expr: &UnaryExpression<'_>, ctx: &mut RuleContext<'_>) {
        if !matches!(expr.operator, UnaryOperator::Delete) {
            return;
        }
        if let Some(path) = matchers::member_path(&expr.argument) {
            if tampered_path(&path) {
                ctx.report(&META, expr.span, format!("delete of {path}"));
            }
        }
    }
}
