//! Name Resolver
//!
//! Rewrites every variable reference into a scope-tagged one. Lookup order
//! inside a function is locals declared so far, then arguments, then module
//! globals, then imported globals. A global initializer only sees the module
//! globals declared before it plus imported ones.
//!
//! Locals are function-scoped from their declaration point; the scope built
//! here is stored back into the function's overload for later passes.

use indexmap::IndexMap;
use tracing::debug;

use crate::syntax::ast::*;
use crate::error::{Diagnostics, Error, ErrorCode};
use super::symbols::{ExternalTable, OverloadOrigin, SymbolTable, VarInfo};

enum Context {
    /// Initializer of the module global at this table index.
    Global { limit: usize },
    Function { args: IndexMap<String, VarInfo>, locals: IndexMap<String, VarInfo> },
}

pub struct NameResolver<'a> {
    table: &'a mut SymbolTable,
    externals: &'a ExternalTable,
    diag: &'a mut Diagnostics,
    context: Context,
    resolved: usize,
}

impl<'a> NameResolver<'a> {
    pub fn new(table: &'a mut SymbolTable, externals: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { table, externals, diag, context: Context::Global { limit: 0 }, resolved: 0 }
    }

    pub fn run(mut self, program: &mut Program) {
        for (index, item) in program.items.iter_mut().enumerate() {
            match item {
                Item::Var(var) => self.resolve_global(var),
                Item::Fn(func) => self.resolve_fn(index, func),
                Item::TypeSyn(_) => {}
            }
        }
        debug!(references = self.resolved, "names: done");
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    fn resolve_global(&mut self, var: &mut VarDecl) {
        let limit = self.table.global_index(&var.name).unwrap_or(self.table.globals.len());
        let is_first = self.table.globals.get(&var.name).is_some_and(|g| g.span == var.span);
        if is_first {
            if let Some(imported) = self.externals.globals.get(&var.name) {
                self.diag.add_warning(ErrorCode::ShadowImportGlobal, var.span, format!(
                    "global `{}` shadows `{}` imported from `{}`",
                    var.name, imported.original, imported.module,
                ));
            }
        }
        self.context = Context::Global { limit };
        self.resolve_expr(&mut var.init);
    }

    fn resolve_fn(&mut self, index: usize, func: &mut FnDef) {
        let Some(OverloadOrigin::Local { args, .. }) = self.table.overload_for_item(index).map(|o| &o.origin) else {
            return;
        };
        self.context = Context::Function { args: args.clone(), locals: IndexMap::new() };
        self.resolve_block(&mut func.body);

        let context = std::mem::replace(&mut self.context, Context::Global { limit: 0 });
        if let (Context::Function { locals: scope, .. }, Some(overload)) = (context, self.table.overload_for_item_mut(index)) {
            if let OverloadOrigin::Local { locals, .. } = &mut overload.origin {
                *locals = scope;
            }
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn resolve_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::VarDecl(var) => {
                    self.resolve_expr(&mut var.init);
                    self.declare_local(var);
                }
                Stmt::Assign(a) => {
                    self.resolve_var(&mut a.target);
                    self.resolve_expr(&mut a.value);
                }
                Stmt::If(i) => {
                    for branch in &mut i.branches {
                        self.resolve_expr(&mut branch.cond);
                        self.resolve_block(&mut branch.body);
                    }
                    if let Some(body) = &mut i.else_body {
                        self.resolve_block(body);
                    }
                }
                Stmt::While(w) => {
                    self.resolve_expr(&mut w.cond);
                    self.resolve_block(&mut w.body);
                }
                Stmt::For(f) => {
                    self.resolve_var(&mut f.var);
                    self.resolve_expr(&mut f.iterable);
                    self.resolve_block(&mut f.body);
                }
                Stmt::Return(Some(e), _) | Stmt::Expr(e) => self.resolve_expr(e),
                Stmt::Return(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
            }
        }
    }

    fn declare_local(&mut self, var: &VarDecl) {
        let Context::Function { args, locals } = &mut self.context else { return };
        // a missing type was reported by the normalizer
        let Some(ty) = &var.ty else { return };

        if let Some(first) = locals.get(&var.name) {
            self.diag.push(Error::at(ErrorCode::DuplicateVarDef, var.span,
                format!("local `{}` is already defined in this function", var.name)).with_related(first.span));
            return;
        }
        if let Some(arg) = args.get(&var.name) {
            self.diag.push(Error::at(ErrorCode::ShadowArg, var.span,
                format!("local `{}` shadows an argument", var.name)).with_related(arg.span));
        } else if let Some(global) = self.table.globals.get(&var.name) {
            self.diag.push(Error::at(ErrorCode::ShadowGlobal, var.span,
                format!("local `{}` shadows a global", var.name)).with_related(global.span));
        } else if let Some(imported) = self.externals.globals.get(&var.name) {
            self.diag.add_warning(ErrorCode::ShadowGlobal, var.span,
                format!("local `{}` shadows the global imported from `{}`", var.name, imported.module));
        }
        locals.insert(var.name.clone(), VarInfo::new(ty.clone(), var.span));
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Var(v) => self.resolve_var(v),
            Expr::Tuple(a, b, _) => {
                self.resolve_expr(a);
                self.resolve_expr(b);
            }
            Expr::Flat(flat) => flat.operands.iter_mut().for_each(|e| self.resolve_expr(e)),
            Expr::Call(call) => call.args.iter_mut().for_each(|e| self.resolve_expr(e)),
            Expr::Typed(call) => call.args.iter_mut().for_each(|e| self.resolve_expr(e)),
            Expr::Int(..) | Expr::Char(..) | Expr::Bool(..) | Expr::Str(..) | Expr::EmptyList(..) => {}
        }
    }

    fn resolve_var(&mut self, var: &mut Variable) {
        if var.reference.is_resolved() {
            return;
        }
        let name = var.reference.name().to_string();
        match self.lookup(&name) {
            Some(reference) => {
                var.reference = reference;
                self.resolved += 1;
            }
            None => {
                let code = match self.context {
                    Context::Global { .. } => ErrorCode::UndefinedGlobalVar,
                    Context::Function { .. } => ErrorCode::UndefinedVar,
                };
                self.diag.add_error(code, var.span, format!("undefined variable `{name}`"));
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Reference> {
        let local_global = match &self.context {
            Context::Function { args, locals } => {
                if locals.contains_key(name) {
                    return Some(Reference::NonGlobal { scope: Scope::Local, name: name.to_string() });
                }
                if args.contains_key(name) {
                    return Some(Reference::NonGlobal { scope: Scope::Arg, name: name.to_string() });
                }
                self.table.globals.contains_key(name)
            }
            Context::Global { limit } => self.table.global_index(name).is_some_and(|i| i < *limit),
        };
        if local_global {
            return Some(Reference::Global { module: None, name: name.to_string(), original: name.to_string() });
        }
        self.externals.globals.get(name).map(|symbol| Reference::Global {
            module: Some(symbol.module.clone()),
            name: name.to_string(),
            original: symbol.original.clone(),
        })
    }
}
