//! Symbol Collector
//!
//! Walks normalized top-level items in order and populates the local table:
//! - Records globals with their declared types
//! - Records one overload per typed function or operator definition, with
//!   its argument scope
//! - Checks that every operator keeps a single fixity across local and
//!   imported definitions

use indexmap::IndexMap;
use tracing::debug;

use crate::syntax::ast::*;
use crate::error::{Diagnostics, Error, ErrorCode};
use super::symbols::{ExternalTable, Overload, OverloadOrigin, SymbolTable, VarInfo};

pub struct Collector<'a> {
    externals: &'a ExternalTable,
    diag: &'a mut Diagnostics,
}

impl<'a> Collector<'a> {
    pub fn new(externals: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { externals, diag }
    }

    pub fn collect(mut self, program: &Program, table: &mut SymbolTable) {
        for (index, item) in program.items.iter().enumerate() {
            match item {
                Item::Var(var) => self.collect_global(var, table),
                Item::Fn(func) => self.collect_fn(index, func, table),
                Item::TypeSyn(_) => {}
            }
        }
        self.check_fixities(program);
        debug!(globals = table.globals.len(), functions = table.functions.len(), "collector: done");
    }

    fn collect_global(&mut self, var: &VarDecl, table: &mut SymbolTable) {
        // a missing type was reported by the normalizer
        let Some(ty) = &var.ty else { return };
        if let Err(first) = table.declare_global(&var.name, VarInfo::new(ty.clone(), var.span)) {
            self.diag.push(Error::at(ErrorCode::DuplicateGlobalVar, var.span,
                format!("global `{}` is already defined", var.name)).with_related(first));
        }
    }

    fn collect_fn(&mut self, index: usize, func: &FnDef, table: &mut SymbolTable) {
        let Some(sig) = &func.sig else { return };
        if sig.params.len() != func.params.len() {
            return;
        }

        let mut args = IndexMap::new();
        for (param, ty) in func.params.iter().zip(&sig.params) {
            args.entry(param.name.clone()).or_insert_with(|| VarInfo::new(ty.clone(), param.span));
        }
        let overload = Overload {
            ty: sig.clone(),
            span: func.span,
            origin: OverloadOrigin::Local { item: index, fixity: func.kind.fixity(), args, locals: IndexMap::new() },
        };

        let namespace = func.kind.namespace();
        if let Err(existing) = table.add_overload(namespace, &func.name, overload) {
            let first = table.overloads(namespace, &func.name)[existing].span;
            self.diag.push(Error::at(ErrorCode::DuplicateOverload, func.span, format!(
                "{} `{}` already has an overload of type `{sig}`",
                namespace.as_str(), func.name,
            )).with_related(first));
        }
    }

    fn check_fixities(&mut self, program: &Program) {
        let mut seen: IndexMap<&str, (Fixity, Span)> = IndexMap::new();
        for item in &program.items {
            let Item::Fn(FnDef { kind: FnKind::Infix(fixity), name, span, .. }) = item else { continue };

            if let Some(imported) = self.externals.fixity_of(name).filter(|f| f != fixity) {
                self.diag.add_error(ErrorCode::FixityMismatch, *span, format!(
                    "`{name}` is declared `{fixity}` but is imported as `{imported}`",
                ));
                continue;
            }
            match seen.get(name.as_str()) {
                Some((first, first_span)) if first != fixity => {
                    self.diag.push(Error::at(ErrorCode::FixityMismatch, *span, format!(
                        "`{name}` is declared `{fixity}` but was earlier declared `{first}`",
                    )).with_related(*first_span));
                }
                Some(_) => {}
                None => {
                    seen.insert(name, (*fixity, *span));
                }
            }
        }
    }
}
