//! Import merger
//!
//! Turns the module's `from … import` statements plus one raw header per
//! imported module into a single External Table. Header entries are
//! normalized before aliasing; built-ins are merged last.

use indexmap::IndexMap;
use tracing::debug;

use crate::builtins::BUILTIN_MODULE;
use crate::error::{Diagnostics, Error, ErrorCode};
use crate::header::{Header, HeaderFunction, Headers};
use crate::syntax::ast::*;
use super::normalizer::normalize_header;
use super::symbols::{ExternalSymbol, ExternalTable, Overload, OverloadOrigin};

/// Result of merging: the External Table and each imported module once.
#[derive(Debug, Clone, Default)]
pub struct Imported {
    pub externals: ExternalTable,
    pub modules: Vec<String>,
}

pub struct ImportMerger<'a> {
    headers: &'a Headers,
    builtins: &'a ExternalTable,
    diag: &'a mut Diagnostics,
    table: ExternalTable,
    modules: Vec<String>,
    /// Where each imported synonym or operator name entered the table.
    origins: IndexMap<String, Span>,
}

impl<'a> ImportMerger<'a> {
    pub fn new(headers: &'a Headers, builtins: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { headers, builtins, diag, table: ExternalTable::new(), modules: Vec::new(), origins: IndexMap::new() }
    }

    pub fn merge(mut self, imports: &[ImportDecl]) -> Imported {
        let mut groups: IndexMap<&str, Vec<&ImportDecl>> = IndexMap::new();
        for decl in imports {
            groups.entry(decl.module.as_str()).or_default().push(decl);
        }

        for (module, decls) in &groups {
            self.modules.push(module.to_string());
            if let Some(header) = self.load(module, decls[0].span) {
                self.merge_module(&header, decls);
            }
        }
        self.merge_builtins();

        debug!(
            modules = self.modules.len(),
            globals = self.table.globals.len(),
            functions = self.table.functions.len(),
            "imports: merged"
        );
        Imported { externals: self.table, modules: self.modules }
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    fn load(&mut self, module: &str, span: Span) -> Option<Header> {
        let Some(text) = self.headers.get(module) else {
            self.diag.add_error(ErrorCode::ImportModuleNotFound, span,
                format!("no header found for module `{module}`"));
            return None;
        };
        let header = match Header::parse(text) {
            Ok(h) => h,
            Err(e) => {
                self.diag.add_error(ErrorCode::HeaderFormatIncorrect, span,
                    format!("header of `{module}`: {e}"));
                return None;
            }
        };
        if header.module != module {
            self.diag.add_error(ErrorCode::HeaderFormatIncorrect, span,
                format!("header for `{module}` declares module `{}`", header.module));
            return None;
        }
        Some(normalize_header(header, self.builtins, self.diag, span))
    }

    // ── Per module ────────────────────────────────────────────────────────────

    fn merge_module(&mut self, header: &Header, decls: &[&ImportDecl]) {
        let all = decls.iter().find(|d| matches!(d.names, ImportNames::All));
        let specific: Vec<&ImportName> = decls
            .iter()
            .filter_map(|d| match &d.names {
                ImportNames::Specific(names) => Some(names),
                ImportNames::All => None,
            })
            .flatten()
            .collect();

        if let Some(all) = all {
            if let Some(first) = specific.first() {
                self.diag.push(Error::at(ErrorCode::ImportAllAndSpecific, first.span,
                    format!("`{}` is imported both entirely and by name", header.module)).with_related(all.span));
            }
            self.merge_all(header, all.span);
        }

        let mut seen: IndexMap<(NameKind, &str, &str), Span> = IndexMap::new();
        for name in specific {
            let effective = name.effective();
            if effective.kind != name.name.kind {
                self.diag.add_error(ErrorCode::ImportAliasKindMismatch, name.span, format!(
                    "`{}` is an {} and cannot be aliased by the {} `{}`",
                    name.name.text, name.name.kind.as_str(), effective.kind.as_str(), effective.text,
                ));
                continue;
            }
            let key = (name.name.kind, name.name.text.as_str(), effective.text.as_str());
            if let Some(first) = seen.get(&key) {
                self.diag.push(Error::at(ErrorCode::DuplicateImport, name.span,
                    format!("`{}` is already imported from `{}`", effective.text, header.module)).with_related(*first));
                continue;
            }
            seen.insert(key, name.span);

            if !self.merge_name(header, &name.name, &effective.text, name.span) {
                self.diag.add_error(ErrorCode::ImportUndefinedSymbol, name.span,
                    format!("module `{}` does not export `{}`", header.module, name.name.text));
            }
        }
    }

    fn merge_all(&mut self, header: &Header, span: Span) {
        for (name, ty) in &header.globals {
            self.add_global(&header.module, name, name, ty, span);
        }
        for (name, ty) in &header.type_syns {
            self.add_type_syn(&header.module, name, name, ty, span);
        }
        for func in &header.functions {
            self.add_function(&header.module, func, &func.name, span);
        }
    }

    /// Merges every symbol named `name` in its lexical category. Returns
    /// whether anything matched.
    fn merge_name(&mut self, header: &Header, name: &Name, effective: &str, span: Span) -> bool {
        let module = header.module.as_str();
        let mut found = false;
        match name.kind {
            NameKind::Ident => {
                for (_, ty) in header.globals.iter().filter(|(n, _)| *n == name.text) {
                    self.add_global(module, &name.text, effective, ty, span);
                    found = true;
                }
            }
            NameKind::TypeIdent => {
                for (_, ty) in header.type_syns.iter().filter(|(n, _)| *n == name.text) {
                    self.add_type_syn(module, &name.text, effective, ty, span);
                    found = true;
                }
            }
            NameKind::Op => {}
        }
        let namespaces: &[Namespace] = match name.kind {
            NameKind::Ident => &[Namespace::Function],
            NameKind::Op => &[Namespace::Prefix, Namespace::Infix],
            NameKind::TypeIdent => &[],
        };
        for func in header.functions.iter().filter(|f| f.name == name.text && namespaces.contains(&f.namespace)) {
            self.add_function(module, func, effective, span);
            found = true;
        }
        found
    }

    // ── Table insertion ───────────────────────────────────────────────────────

    fn add_global(&mut self, module: &str, original: &str, effective: &str, ty: &Type, span: Span) {
        let symbol = ExternalSymbol { module: module.to_string(), original: original.to_string(), ty: ty.clone() };
        if let Err(existing) = self.table.insert_global(effective, symbol) {
            let message = format!(
                "global `{effective}` from `{module}` clashes with `{}` imported from `{}`",
                existing.original, existing.module,
            );
            self.diag.add_error(ErrorCode::ClashImportGlobal, span, message);
        }
    }

    fn add_type_syn(&mut self, module: &str, original: &str, effective: &str, ty: &Type, span: Span) {
        let symbol = ExternalSymbol { module: module.to_string(), original: original.to_string(), ty: ty.clone() };
        match self.table.insert_type_syn(effective, symbol) {
            Ok(()) => {
                self.origins.entry(effective.to_string()).or_insert(span);
            }
            Err(existing) => {
                let message = format!(
                    "type synonym `{effective}` from `{module}` clashes with `{}` imported from `{}`",
                    existing.original, existing.module,
                );
                self.diag.add_error(ErrorCode::ClashImportType, span, message);
            }
        }
    }

    fn add_function(&mut self, module: &str, func: &HeaderFunction, effective: &str, span: Span) {
        if func.namespace == Namespace::Infix {
            if let (Some(existing), Some(fixity)) = (self.table.fixity_of(effective), func.fixity) {
                if existing != fixity {
                    self.diag.add_error(ErrorCode::FixityMismatch, span, format!(
                        "`{effective}` from `{module}` is `{fixity}` but is already imported as `{existing}`",
                    ));
                    return;
                }
            }
            self.origins.entry(effective.to_string()).or_insert(span);
        }
        let overload = Overload {
            ty: func.ty.clone(),
            span: Span::default(),
            origin: OverloadOrigin::External {
                module: module.to_string(),
                original: func.name.clone(),
                fixity: func.fixity,
                constant: func.constant,
            },
        };
        self.table.push_overload(func.namespace, effective, overload);
    }

    // ── Built-ins ─────────────────────────────────────────────────────────────

    fn merge_builtins(&mut self) {
        for (name, symbol) in &self.builtins.type_syns {
            if let Err(existing) = self.table.insert_type_syn(name, symbol.clone()) {
                let span = self.origins.get(name).copied().unwrap_or_default();
                let message = format!(
                    "type synonym `{name}` imported from `{}` clashes with the built-in one",
                    existing.module,
                );
                self.diag.add_error(ErrorCode::ClashBuiltinType, span, message);
            }
        }
        for ((namespace, name), overloads) in &self.builtins.functions {
            for overload in overloads {
                if let (Some(existing), Some(fixity)) = (self.table.fixity_of(name), overload.fixity()) {
                    if existing != fixity {
                        let span = self.origins.get(name).copied().unwrap_or_default();
                        self.diag.add_error(ErrorCode::FixityMismatch, span, format!(
                            "imported `{name}` is `{existing}` but the built-in one is `{fixity}`",
                        ));
                        continue;
                    }
                }
                self.table.push_overload(*namespace, name, overload.clone());
            }
        }
        debug!(module = BUILTIN_MODULE, "imports: built-ins merged");
    }
}
