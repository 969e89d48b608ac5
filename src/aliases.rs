use std::collections::{BTreeSet, HashMap};

use oxc_ast::ast::*;

use crate::matchers;

/// Per-file maps linking local names back to the canonical module they came
/// from. Built once per file from its top-level statements and dropped when
/// the file scan completes. Keys are the verbatim specifier strings.
#[derive(Debug, Default)]
pub struct AliasMaps {
    /// module → local names bound via default import or CJS alias
    /// (`import cp from 'child_process'`, `const cp = require(...)`).
    pub module_aliases: HashMap<String, BTreeSet<String>>,
    /// module → local name bound via `import * as N`.
    pub namespace_aliases: HashMap<String, String>,
    /// module → original export name → locally-bound name (renames included).
    pub named_imports: HashMap<String, HashMap<String, String>>,
}

impl AliasMaps {
    pub fn from_program(program: &Program<'_>) -> Self {
        let mut maps = AliasMaps::default();
        for statement in &program.body {
            match statement {
                Statement::ImportDeclaration(decl) => maps.record_import(decl),
                Statement::VariableDeclaration(decl) => {
                    for declarator in &decl.declarations {
                        maps.record_require(declarator);
                    }
                }
                _ => {}
            }
        }
        maps
    }

    fn record_import(&mut self, decl: &ImportDeclaration<'_>) {
        // Type-only imports bind no runtime value.
        if matches!(decl.import_kind, ImportOrExportKind::Type) {
            return;
        }
        let source = decl.source.value.to_string();
        let Some(specifiers) = &decl.specifiers else {
            return;
        };

        for spec in specifiers {
            match spec {
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    self.module_aliases
                        .entry(source.clone())
                        .or_default()
                        .insert(s.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    self.namespace_aliases
                        .insert(source.clone(), s.local.name.to_string());
                }
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    let imported = match &s.imported {
                        ModuleExportName::IdentifierName(id) => id.name.to_string(),
                        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
                        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
                    };
                    self.named_imports
                        .entry(source.clone())
                        .or_default()
                        .insert(imported, s.local.name.to_string());
                }
            }
        }
    }

    fn record_require(&mut self, declarator: &VariableDeclarator<'_>) {
        let Some(Expression::CallExpression(call)) = &declarator.init else {
            return;
        };
        let Some(source) = matchers::require_argument(call) else {
            return;
        };

        match &declarator.id {
            BindingPattern::BindingIdentifier(ident) => {
                self.module_aliases
                    .entry(source.to_string())
                    .or_default()
                    .insert(ident.name.to_string());
            }
            BindingPattern::ObjectPattern(pattern) => {
                for property in &pattern.properties {
                    // Computed keys and rest elements are not alias bindings.
                    if property.computed {
                        continue;
                    }
                    let PropertyKey::StaticIdentifier(key) = &property.key else {
                        continue;
                    };
                    let BindingPattern::BindingIdentifier(local) = &property.value else {
                        continue;
                    };
                    self.named_imports
                        .entry(source.to_string())
                        .or_default()
                        .insert(key.name.to_string(), local.name.to_string());
                }
            }
            _ => {}
        }
    }
}
