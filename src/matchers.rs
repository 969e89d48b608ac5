use std::collections::HashSet;

use once_cell::sync::Lazy;
use oxc_ast::ast::*;
use regex::Regex;

use crate::aliases::AliasMaps;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://").unwrap());
// Stops at '/', '?', '#', ':' or whitespace and strips userinfo, so
// `https://user@evil.com#.trusted.com` extracts `evil.com`.
static URL_HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://(?:[^@/?#\s]+@)?([^/?#:\s"'`]+)"#).unwrap());

const SENSITIVE_PATH_MARKERS: &[&str] = &[
    "~/.ssh",
    "/etc/passwd",
    "/etc/shadow",
    "/var/run/secrets",
    "/.ssh/",
    "/.aws/credentials",
    "/.env",
];

pub(crate) fn is_identifier(expr: &Expression<'_>, name: &str) -> bool {
    matches!(expr, Expression::Identifier(ident) if ident.name.as_str() == name)
}

/// Call whose callee is the bare global `name`. Method calls do not match.
pub(crate) fn is_call_to_global(call: &CallExpression<'_>, name: &str) -> bool {
    is_identifier(&call.callee, name)
}

/// `new name(...)`.
pub(crate) fn is_new_expression_of(expr: &NewExpression<'_>, name: &str) -> bool {
    is_identifier(&expr.callee, name)
}

/// For `obj.method(...)` with a plain identifier object, the pair
/// `(object name, method name)`.
pub(crate) fn static_member_call<'a>(call: &'a CallExpression<'a>) -> Option<(&'a str, &'a str)> {
    match &call.callee {
        Expression::StaticMemberExpression(member) => match &member.object {
            Expression::Identifier(obj) => {
                Some((obj.name.as_str(), member.property.name.as_str()))
            }
            _ => None,
        },
        _ => None,
    }
}

/// Every local name bound to `module` (default imports, CJS aliases, and the
/// namespace alias), considering both the bare and `node:`-prefixed specifier.
pub(crate) fn module_alias_names<'m>(aliases: &'m AliasMaps, module: &str) -> HashSet<&'m str> {
    let mut names = HashSet::new();
    let prefixed = format!("node:{module}");
    for key in [module, prefixed.as_str()] {
        if let Some(set) = aliases.module_aliases.get(key) {
            names.extend(set.iter().map(|s| s.as_str()));
        }
        if let Some(ns) = aliases.namespace_aliases.get(key) {
            names.insert(ns.as_str());
        }
    }
    names
}

/// `obj.m(...)` where `m` is one of `methods` and `obj` is a local alias of
/// `module` in this file.
pub(crate) fn is_member_call(
    call: &CallExpression<'_>,
    module: &str,
    methods: &[&str],
    aliases: &AliasMaps,
) -> bool {
    let Some((object, method)) = static_member_call(call) else {
        return false;
    };
    methods.contains(&method) && module_alias_names(aliases, module).contains(object)
}

/// `process.prop` (dot or literal bracket notation).
pub(crate) fn is_process_property(member: &MemberExpression<'_>, prop: &str) -> bool {
    match member {
        MemberExpression::StaticMemberExpression(m) => {
            is_identifier(&m.object, "process") && m.property.name.as_str() == prop
        }
        MemberExpression::ComputedMemberExpression(m) => {
            is_identifier(&m.object, "process")
                && string_literal_value(&m.expression) == Some(prop)
        }
        MemberExpression::PrivateFieldExpression(_) => false,
    }
}

/// The specifier of a call to bare `require` with a single literal argument.
pub(crate) fn require_argument<'a>(call: &'a CallExpression<'a>) -> Option<&'a str> {
    if !is_call_to_global(call, "require") || call.arguments.len() != 1 {
        return None;
    }
    argument_string_value(call.arguments.first()?)
}

/// Whether `require(...)` is called with a specifier matching `pattern`.
pub(crate) fn is_require_of(call: &CallExpression<'_>, pattern: &Regex) -> bool {
    require_argument(call).is_some_and(|specifier| pattern.is_match(specifier))
}

/// Whether `specifier` names `module`, accepting the `node:` prefix.
pub(crate) fn is_module_specifier(specifier: &str, module: &str) -> bool {
    specifier == module
        || specifier
            .strip_prefix("node:")
            .is_some_and(|rest| rest == module)
}

/// String value of a string literal or substitution-free template literal.
pub(crate) fn string_literal_value<'a>(expr: &'a Expression<'a>) -> Option<&'a str> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        Expression::TemplateLiteral(tpl) => template_literal_value(tpl),
        _ => None,
    }
}

pub(crate) fn template_literal_value<'a>(tpl: &'a TemplateLiteral<'a>) -> Option<&'a str> {
    if !tpl.expressions.is_empty() || tpl.quasis.len() != 1 {
        return None;
    }
    let quasi = tpl.quasis.first()?;
    match &quasi.value.cooked {
        Some(cooked) => Some(cooked.as_str()),
        None => Some(quasi.value.raw.as_str()),
    }
}

pub(crate) fn argument_string_value<'a>(arg: &'a Argument<'a>) -> Option<&'a str> {
    match arg {
        Argument::StringLiteral(lit) => Some(lit.value.as_str()),
        Argument::TemplateLiteral(tpl) => template_literal_value(tpl),
        _ => None,
    }
}

/// `Buffer.from(arg0[, encoding])`. With `encoding` given, the second
/// argument must be a string literal equal to it.
pub(crate) fn is_buffer_from_call(call: &CallExpression<'_>, encoding: Option<&str>) -> bool {
    let Some((object, method)) = static_member_call(call) else {
        return false;
    };
    if object != "Buffer" || method != "from" {
        return false;
    }
    match encoding {
        None => !call.arguments.is_empty(),
        Some(expected) => call
            .arguments
            .get(1)
            .and_then(argument_string_value)
            .is_some_and(|actual| actual == expected),
    }
}

/// Dotted access path for member chains rooted at an identifier, with
/// literal bracket keys folded in: `Module["_load"]` becomes `Module._load`,
/// dynamic keys become `[..]`.
pub(crate) fn member_path(expr: &Expression<'_>) -> Option<String> {
    match expr {
        Expression::Identifier(ident) => Some(ident.name.to_string()),
        Expression::StaticMemberExpression(member) => {
            member_path(&member.object).map(|base| format!("{base}.{}", member.property.name))
        }
        Expression::ComputedMemberExpression(member) => {
            let base = member_path(&member.object)?;
            match string_literal_value(&member.expression) {
                Some(key) => Some(format!("{base}.{key}")),
                None => Some(format!("{base}[..]")),
            }
        }
        _ => None,
    }
}

pub(crate) fn matches_url(s: &str) -> bool {
    URL_RE.is_match(s)
}

/// Hostname of the first `http(s)://` URL contained in `s`.
pub(crate) fn url_host(s: &str) -> Option<String> {
    URL_HOST_RE
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub(crate) fn sensitive_path_marker(s: &str) -> Option<&'static str> {
    SENSITIVE_PATH_MARKERS
        .iter()
        .find(|marker| s.contains(*marker))
        .copied()
}
