use once_cell::sync::Lazy;
use oxc_ast::ast::*;
use oxc_span::GetSpan;
use regex::Regex;

use crate::engine::{RuleContext, RuleMeta, SourceRule};
use crate::matchers;
use crate::report::Severity;

pub static META: RuleMeta = RuleMeta {
    id: "SEC005",
    default_severity: Severity::Block,
    title: "native addon loading",
    description: "Native addons run unreviewed machine code inside the host.",
    remediation: "Extensions must be pure JavaScript/TypeScript.",
    docs_url: None,
};

static NATIVE_FILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.node$").unwrap());

const LOADER_MODULES: &[&str] = &[
    "node-gyp-build",
    "bindings",
    "ffi-napi",
    "ref-napi",
    "node-addon-api",
    "node-pre-gyp",
];

/// Flags `require("*.node")`, the well-known addon loader packages, and
/// `process.dlopen`.
pub struct Sec005;

impl SourceRule for Sec005 {
    fn meta(&self) -> &'static RuleMeta {
        &META
    }

    fn on_import(&self, decl: &ImportDeclaration<'_>, ctx: &mut RuleContext<'_>) {
        let source = decl.source.value.as_str();
        if LOADER_MODULES.contains(&source) {
            ctx.report(&META, decl.span, format!("import of addon loader `{source}`"));
        }
    }

    fn on_call(&self, call: &CallExpression<'_>, ctx: &mut RuleContext<'_>) {
        let Some(specifier) = matchers::require_argument(call) else {
            return;
        };
        if NATIVE_FILE_RE.is_match(specifier) {
            ctx.report(&META, call.span, format!("require of native addon `{specifier}`"));
        } else if LOADER_MODULES.contains(&specifier) {
            ctx.report(
                &META,
                call.span,
                format!("require of addon loader `{specifier}`"),
            );
        }
    }

    fn on_member(&self, member: &MemberExpression<'_>, ctx: &mut RuleContext<'_>) {
        if matchers::is_process_property(member, "dlopen") {
            ctx.report(&META, member.span(), "use of process.dlopen");
        }
    }
}
