use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};

use crate::aliases::AliasMaps;
use crate::config::SecurityConfig;
use crate::discovery::collect_source_files;
use crate::matchers;
use crate::report::{Finding, ScanReport, Severity, line_col, line_snippet};

/// Static description of a rule: stable id, default severity, and the
/// documentation surfaced with findings.
#[derive(Debug)]
pub struct RuleMeta {
    pub id: &'static str,
    pub default_severity: Severity,
    pub title: &'static str,
    pub description: &'static str,
    pub remediation: &'static str,
    pub docs_url: Option<&'static str>,
}

/// Internal pseudo-rule for parse and read failures.
pub static INTERNAL_META: RuleMeta = RuleMeta {
    id: "SEC000",
    default_severity: Severity::Warn,
    title: "scanner failure",
    description: "A file could not be parsed or read; it was skipped.",
    remediation: "Ensure the file is syntactically valid UTF-8 source.",
    docs_url: None,
};

/// Per-scan options. Severity overrides replace a rule's default severity;
/// `Severity::Off` suppresses its findings entirely.
#[derive(Debug, Default)]
pub struct ScanOptions {
    pub severity_overrides: HashMap<String, Severity>,
}

/// Context handed to rule handlers for one file.
pub struct RuleContext<'s> {
    pub file: &'s Path,
    pub source: &'s str,
    pub config: &'s SecurityConfig,
    pub aliases: &'s AliasMaps,
    overrides: &'s HashMap<String, Severity>,
    findings: Vec<Finding>,
}

impl RuleContext<'_> {
    /// Record a finding at `span`. Severity comes from the per-rule override
    /// when present, else the rule's default; `Off` drops the finding.
    pub fn report(&mut self, meta: &RuleMeta, span: Span, message: impl Into<String>) {
        let severity = self
            .overrides
            .get(meta.id)
            .copied()
            .unwrap_or(meta.default_severity);
        if severity == Severity::Off {
            return;
        }
        let offset = span.start as usize;
        let (line, col) = line_col(self.source, offset);
        self.findings.push(Finding {
            rule_id: meta.id.to_string(),
            severity,
            message: message.into(),
            file: self.file.display().to_string(),
            line,
            col,
            snippet: line_snippet(self.source, offset),
        });
    }
}

/// A source-mode rule: per-node-kind handler slots with no-op defaults, so a
/// rule only fills the slots it cares about. Handlers are invoked in AST
/// depth-first preorder; `on_file_start` fires once per file before the walk,
/// in rule-registration order.
pub trait SourceRule: Send + Sync {
    fn meta(&self) -> &'static RuleMeta;

    fn on_file_start(&self, _ctx: &mut RuleContext<'_>) {}
    fn on_call(&self, _call: &CallExpression<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_new(&self, _expr: &NewExpression<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_import(&self, _decl: &ImportDeclaration<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_member(&self, _member: &MemberExpression<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_assignment(&self, _expr: &AssignmentExpression<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_unary(&self, _expr: &UnaryExpression<'_>, _ctx: &mut RuleContext<'_>) {}
    fn on_string_literal(&self, _value: &str, _span: Span, _ctx: &mut RuleContext<'_>) {}
}

struct EngineVisitor<'s> {
    rules: &'s [Box<dyn SourceRule>],
    ctx: RuleContext<'s>,
}

impl<'a> Visit<'a> for EngineVisitor<'_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        for rule in self.rules {
            rule.on_call(call, &mut self.ctx);
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_new_expression(&mut self, expr: &NewExpression<'a>) {
        for rule in self.rules {
            rule.on_new(expr, &mut self.ctx);
        }
        walk::walk_new_expression(self, expr);
    }

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        for rule in self.rules {
            rule.on_import(decl, &mut self.ctx);
        }
        walk::walk_import_declaration(self, decl);
    }

    fn visit_member_expression(&mut self, member: &MemberExpression<'a>) {
        for rule in self.rules {
            rule.on_member(member, &mut self.ctx);
        }
        walk::walk_member_expression(self, member);
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        for rule in self.rules {
            rule.on_assignment(expr, &mut self.ctx);
        }
        walk::walk_assignment_expression(self, expr);
    }

    fn visit_unary_expression(&mut self, expr: &UnaryExpression<'a>) {
        for rule in self.rules {
            rule.on_unary(expr, &mut self.ctx);
        }
        walk::walk_unary_expression(self, expr);
    }

    fn visit_string_literal(&mut self, lit: &StringLiteral<'a>) {
        for rule in self.rules {
            rule.on_string_literal(lit.value.as_str(), lit.span, &mut self.ctx);
        }
    }

    fn visit_template_literal(&mut self, tpl: &TemplateLiteral<'a>) {
        // Templates with substitutions are dispatched to no one: their value
        // is not statically known.
        if let Some(value) = matchers::template_literal_value(tpl) {
            for rule in self.rules {
                rule.on_string_literal(value, tpl.span, &mut self.ctx);
            }
        }
        walk::walk_template_literal(self, tpl);
    }
}

/// Result of scanning one file. `parsed` is false when the file produced the
/// internal SEC000 finding instead of being analyzed.
pub struct FileScan {
    pub findings: Vec<Finding>,
    pub parsed: bool,
}

pub(crate) fn internal_finding(file: &Path, message: String) -> Finding {
    Finding {
        rule_id: INTERNAL_META.id.to_string(),
        severity: INTERNAL_META.default_severity,
        message,
        file: file.display().to_string(),
        line: 1,
        col: 1,
        snippet: None,
    }
}

/// Scan a single source file: parse, build fresh alias maps, fire
/// `on_file_start`, then walk the AST dispatching per-kind handlers.
/// Findings come back in the order `report` was called.
pub fn scan_file(
    path: &Path,
    source: &str,
    rules: &[Box<dyn SourceRule>],
    cfg: &SecurityConfig,
    options: &ScanOptions,
) -> FileScan {
    let allocator = Allocator::default();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    // JSX only for .tsx/.jsx: with JSX on, TS generics like `<T>(x) =>`
    // parse as JSX tags.
    let is_jsx_file = ext == "tsx" || ext == "jsx";
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(is_jsx_file);

    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let count = ret.errors.len().max(1);
        return FileScan {
            findings: vec![internal_finding(
                path,
                format!("failed to parse source file: {count} syntax error(s)"),
            )],
            parsed: false,
        };
    }

    let aliases = AliasMaps::from_program(&ret.program);
    let mut visitor = EngineVisitor {
        rules,
        ctx: RuleContext {
            file: path,
            source,
            config: cfg,
            aliases: &aliases,
            overrides: &options.severity_overrides,
            findings: Vec::new(),
        },
    };

    for rule in rules {
        rule.on_file_start(&mut visitor.ctx);
    }
    visitor.visit_program(&ret.program);

    FileScan {
        findings: visitor.ctx.findings,
        parsed: true,
    }
}

/// Scan every source file under `root`. Alias maps are rebuilt per file;
/// unreadable or unparsable files contribute a SEC000 finding and scanning
/// continues. `scanned_files` counts files successfully parsed.
pub fn scan_tree(
    root: &Path,
    rules: &[Box<dyn SourceRule>],
    cfg: &SecurityConfig,
    options: &ScanOptions,
) -> Result<ScanReport> {
    let files = collect_source_files(root, cfg)?;

    let mut findings = Vec::new();
    let mut scanned_files = 0;
    for file in &files {
        let source = match fs::read_to_string(file) {
            Ok(source) => source,
            Err(err) => {
                findings.push(internal_finding(
                    file,
                    format!("failed to read source file: {err}"),
                ));
                continue;
            }
        };
        let scan = scan_file(file, &source, rules, cfg, options);
        if scan.parsed {
            scanned_files += 1;
        }
        findings.extend(scan.findings);
    }

    Ok(ScanReport::from_findings(findings, scanned_files))
}
