//! Type Checker
//!
//! Assigns types bottom-up and prunes with the expected type top-down.
//! Every call ends up bound to exactly one overload and rewritten into a
//! `TypedCall`.
//!
//! Overload selection: gather every visible overload, drop those whose
//! arity or return type cannot fit, then check each survivor's arguments
//! with diagnostics set aside. The winner keeps the arguments and
//! diagnostics of its trial, so a failed candidate never leaves errors
//! behind and no argument is checked twice for the same overload.
//!
//! Constness of global initializers is checked on the bound tree.

use indexmap::IndexMap;
use tracing::debug;

use crate::syntax::ast::*;
use crate::error::{Diagnostics, Error, ErrorCode};
use super::lookup::{self, Candidate};
use super::symbols::{ExternalTable, Overload, OverloadOrigin, SymbolTable, VarInfo};

/// A rewritten expression and its type, `None` when it could not be typed.
type Checked = (Expr, Option<Type>);

/// Arguments rewritten while trying one overload.
struct Trial {
    args: Vec<Expr>,
    /// Tolerated tuple-component errors, reported if the overload wins.
    errors: Vec<Error>,
}

/// Scopes of the function whose body is being checked.
struct FnScope<'a> {
    args: &'a IndexMap<String, VarInfo>,
    locals: &'a IndexMap<String, VarInfo>,
    ret: &'a Type,
}

pub struct TypeResolver<'a> {
    table: &'a SymbolTable,
    externals: &'a ExternalTable,
    diag: &'a mut Diagnostics,
    errors: Vec<Error>,
    /// How many of `errors` sit in a tuple component whose sibling checked
    /// clean. These do not rule out an overload.
    tolerated: usize,
    /// `None` while checking a global initializer.
    scope: Option<FnScope<'a>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(table: &'a SymbolTable, externals: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { table, externals, diag, errors: Vec::new(), tolerated: 0, scope: None }
    }

    pub fn run(mut self, program: &mut Program) {
        for (index, item) in program.items.iter_mut().enumerate() {
            match item {
                Item::Var(var) => self.check_global(var),
                Item::Fn(func) => self.check_fn(index, func),
                Item::TypeSyn(_) => {}
            }
        }
        debug!(errors = self.errors.len(), "checker: done");
        for error in std::mem::take(&mut self.errors) {
            self.diag.push(error);
        }
    }

    // ── Items ─────────────────────────────────────────────────────────────────

    fn check_global(&mut self, var: &mut VarDecl) {
        self.scope = None;
        let Some(ty) = var.ty.clone() else { return };
        var.init = self.check_expr(&var.init, Some(&ty)).0;
        self.require_constant(&var.init);
    }

    /// Every call in a global initializer must be bound to a constant overload.
    fn require_constant(&mut self, expr: &Expr) {
        match expr {
            Expr::Typed(call) => {
                if !self.overloads_of(call).get(call.overload).is_some_and(Overload::is_constant) {
                    self.error(ErrorCode::GlobalDefMustBeConstant, call.span, format!(
                        "global initializers may only call constant built-ins, `{}` is not one",
                        call.name,
                    ));
                }
                for arg in &call.args {
                    self.require_constant(arg);
                }
            }
            Expr::Tuple(a, b, _) => {
                self.require_constant(a);
                self.require_constant(b);
            }
            _ => {}
        }
    }

    fn check_fn(&mut self, index: usize, func: &mut FnDef) {
        let table = self.table;
        let Some(overload) = table.overload_for_item(index) else { return };
        let OverloadOrigin::Local { args, locals, .. } = &overload.origin else { return };

        self.scope = Some(FnScope { args, locals, ret: &overload.ty.ret });
        self.check_block(&mut func.body);
        self.scope = None;
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn check_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::VarDecl(var) => {
                if let Some(ty) = var.ty.clone() {
                    var.init = self.check_expr(&var.init, Some(&ty)).0;
                }
            }
            Stmt::Assign(a) => {
                let (target, ty) = self.check_var(&a.target, None);
                a.target = target;
                if let Some(ty) = ty {
                    a.value = self.check_expr(&a.value, Some(&ty)).0;
                }
            }
            Stmt::If(i) => {
                for branch in &mut i.branches {
                    branch.cond = self.check_expr(&branch.cond, Some(&Type::BOOL)).0;
                    self.check_block(&mut branch.body);
                }
                if let Some(body) = &mut i.else_body {
                    self.check_block(body);
                }
            }
            Stmt::While(w) => {
                w.cond = self.check_expr(&w.cond, Some(&Type::BOOL)).0;
                self.check_block(&mut w.body);
            }
            Stmt::For(f) => {
                let (var, ty) = self.check_var(&f.var, None);
                f.var = var;
                if let Some(elem) = ty {
                    f.iterable = self.check_expr(&f.iterable, Some(&Type::list(elem))).0;
                }
                self.check_block(&mut f.body);
            }
            Stmt::Return(value, span) => self.check_return(value, *span),
            Stmt::Expr(e) => *e = self.check_expr(e, None).0,
            Stmt::Break(_) | Stmt::Continue(_) => {}
        }
    }

    fn check_return(&mut self, value: &mut Option<Expr>, span: Span) {
        let Some(ret) = self.scope.as_ref().map(|s| s.ret) else { return };
        match value {
            Some(_) if ret.is_void() => {
                self.error(ErrorCode::ReturnValueInVoid, span, "cannot return a value from a `Void` function");
            }
            Some(e) => *e = self.check_expr(e, Some(ret)).0,
            None if !ret.is_void() => {
                self.error(ErrorCode::MissingReturnValue, span, format!("missing return value of type `{ret}`"));
            }
            None => {}
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    pub fn check_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> Checked {
        match expr {
            Expr::Int(_, span)  => self.literal(expr, Type::INT, expected, *span),
            Expr::Char(_, span) => self.literal(expr, Type::CHAR, expected, *span),
            Expr::Bool(_, span) => self.literal(expr, Type::BOOL, expected, *span),
            Expr::Str(_, span)  => self.literal(expr, Type::list(Type::CHAR), expected, *span),
            Expr::EmptyList(ann, span) => self.check_empty_list(ann.as_ref(), expected, *span),
            Expr::Tuple(a, b, span) => self.check_tuple(a, b, expected, *span),
            Expr::Var(v) => {
                let (var, ty) = self.check_var(v, expected);
                (Expr::Var(var), ty)
            }
            // only left flat after an undefined operator, which blocked this stage
            Expr::Flat(_) => (expr.clone(), None),
            Expr::Call(call) => self.check_call(call, expected),
            Expr::Typed(call) => self.recheck_typed(call, expected),
        }
    }

    fn literal(&mut self, expr: &Expr, ty: Type, expected: Option<&Type>, span: Span) -> Checked {
        self.expect(&ty, expected, span);
        (expr.clone(), Some(ty))
    }

    fn check_empty_list(&mut self, ann: Option<&Type>, expected: Option<&Type>, span: Span) -> Checked {
        match expected.or(ann) {
            Some(list) if matches!(list, Type::List(_)) => {
                (Expr::EmptyList(Some(list.clone()), span), Some(list.clone()))
            }
            Some(other) => {
                self.error(ErrorCode::TypeMismatch, span, format!("expected `{other}`, found an empty list"));
                (Expr::EmptyList(None, span), None)
            }
            None => {
                self.error(ErrorCode::EmptyListNeedsType, span, "cannot infer the element type of `[]`");
                (Expr::EmptyList(None, span), None)
            }
        }
    }

    /// Each component is checked on its own. A tuple still fits when one of
    /// its components does; the other component's errors are tolerated.
    fn check_tuple(&mut self, a: &Expr, b: &Expr, expected: Option<&Type>, span: Span) -> Checked {
        let (ea, eb) = match expected {
            Some(Type::Tuple(ta, tb)) => (Some(&**ta), Some(&**tb)),
            Some(other) => {
                self.error(ErrorCode::UnexpectedTuple, span, format!("expected `{other}`, found a tuple"));
                (None, None)
            }
            None => (None, None),
        };
        let (a, ta, a_blocking) = self.check_component(a, ea);
        let (b, tb, b_blocking) = self.check_component(b, eb);
        if (a_blocking == 0) != (b_blocking == 0) {
            self.tolerated += a_blocking + b_blocking;
        }
        let ty = ta.or_else(|| ea.cloned()).zip(tb.or_else(|| eb.cloned())).map(|(x, y)| Type::tuple(x, y));
        (Expr::Tuple(Box::new(a), Box::new(b), span), ty)
    }

    /// Also returns how many new errors are not already tolerated.
    fn check_component(&mut self, expr: &Expr, expected: Option<&Type>) -> (Expr, Option<Type>, usize) {
        let (errors, tolerated) = (self.errors.len(), self.tolerated);
        let (expr, ty) = self.check_expr(expr, expected);
        let blocking = (self.errors.len() - errors) - (self.tolerated - tolerated);
        (expr, ty, blocking)
    }

    fn check_var(&mut self, var: &Variable, expected: Option<&Type>) -> (Variable, Option<Type>) {
        let mut checked = var.clone();
        // unresolved references were reported by the name resolver
        let Some(declared) = self.declared_type(&var.reference) else { return (checked, None) };
        match lookup::narrow(&declared, &var.fields) {
            Ok(ty) => {
                self.expect(&ty, expected, var.span);
                checked.ty = Some(ty.clone());
                (checked, Some(ty))
            }
            Err(e) => {
                self.error(e.code, var.span, e.message);
                (checked, None)
            }
        }
    }

    fn declared_type(&self, reference: &Reference) -> Option<Type> {
        match reference {
            Reference::Global { module: None, name, .. } => self.table.globals.get(name).map(|g| g.ty.clone()),
            Reference::Global { module: Some(_), name, .. } => self.externals.globals.get(name).map(|g| g.ty.clone()),
            Reference::NonGlobal { scope, name } => {
                let fn_scope = self.scope.as_ref()?;
                let vars = match scope {
                    Scope::Local => fn_scope.locals,
                    Scope::Arg   => fn_scope.args,
                };
                vars.get(name).map(|v| v.ty.clone())
            }
            Reference::Unresolved(_) => None,
        }
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    fn check_call(&mut self, call: &Call, expected: Option<&Type>) -> Checked {
        let all = lookup::candidates(self.table, self.externals, call.namespace, &call.name);
        if all.is_empty() {
            let code = match call.namespace {
                Namespace::Function => ErrorCode::UndefinedFun,
                Namespace::Prefix | Namespace::Infix => ErrorCode::UndefinedOp,
            };
            self.error(code, call.span, format!("undefined {} `{}`", call.namespace.as_str(), call.name));
            return (Expr::Call(call.clone()), None);
        }

        let survivors: Vec<Candidate<'a>> = all
            .into_iter()
            .filter(|c| c.overload.ty.params.len() == call.args.len())
            .filter(|c| expected.is_none_or(|t| c.overload.ty.ret == *t))
            .collect();
        let mut matches: Vec<(Candidate<'a>, Trial)> = survivors
            .into_iter()
            .filter_map(|c| self.args_match(&call.args, &c.overload.ty.params).map(|trial| (c, trial)))
            .collect();

        let winner = match matches.len() {
            0 => {
                self.no_match(call, expected);
                return (Expr::Call(call.clone()), None);
            }
            1 => 0,
            many => {
                let local: Vec<usize> = matches
                    .iter()
                    .enumerate()
                    .filter(|(_, (c, _))| c.overload.is_local())
                    .map(|(i, _)| i)
                    .collect();
                match local.as_slice() {
                    [winner] => *winner,
                    _ => {
                        self.ambiguous(call, expected, many);
                        return (Expr::Call(call.clone()), None);
                    }
                }
            }
        };
        let (chosen, trial) = matches.swap_remove(winner);
        self.bind(call, chosen, trial)
    }

    /// Checks `args` against `params` with diagnostics set aside. `None` when
    /// some argument left an error that is not tolerated.
    fn args_match(&mut self, args: &[Expr], params: &[Type]) -> Option<Trial> {
        let saved = (std::mem::take(&mut self.errors), std::mem::take(&mut self.tolerated));
        let mut checked = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(params) {
            checked.push(self.check_expr(arg, Some(param)).0);
            if self.errors.len() > self.tolerated {
                break;
            }
        }
        let fits = self.errors.len() == self.tolerated;
        let errors = std::mem::replace(&mut self.errors, saved.0);
        self.tolerated = saved.1;
        fits.then_some(Trial { args: checked, errors })
    }

    fn bind(&mut self, call: &Call, chosen: Candidate<'a>, trial: Trial) -> Checked {
        let ty = &chosen.overload.ty;
        self.tolerated += trial.errors.len();
        self.errors.extend(trial.errors);

        let typed = TypedCall {
            namespace: call.namespace,
            name: call.name.clone(),
            original: chosen.original(&call.name).to_string(),
            overload: chosen.index,
            module: chosen.overload.module().map(str::to_string),
            returns_value: ty.returns_value(),
            ty: ty.ret.clone(),
            args: trial.args,
            span: call.span,
        };
        (Expr::Typed(typed), Some(ty.ret.clone()))
    }

    fn overloads_of(&self, call: &TypedCall) -> &'a [Overload] {
        let (table, externals) = (self.table, self.externals);
        match call.module {
            None => table.overloads(call.namespace, &call.name),
            Some(_) => externals.overloads(call.namespace, &call.name),
        }
    }

    /// A call bound by an earlier run keeps its overload; only the arguments
    /// and the result are checked again.
    fn recheck_typed(&mut self, call: &TypedCall, expected: Option<&Type>) -> Checked {
        let Some(overload) = self.overloads_of(call).get(call.overload) else {
            let raw = Call { namespace: call.namespace, name: call.name.clone(), args: call.args.clone(), span: call.span };
            return self.check_call(&raw, expected);
        };

        let mut typed = call.clone();
        typed.args = call
            .args
            .iter()
            .zip(&overload.ty.params)
            .map(|(arg, param)| self.check_expr(arg, Some(param)).0)
            .collect();
        self.expect(&call.ty, expected, call.span);
        (Expr::Typed(typed), Some(call.ty.clone()))
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    fn no_match(&mut self, call: &Call, expected: Option<&Type>) {
        let args = self.describe_args(&call.args);
        let name = &call.name;
        let (code, message) = match (call.namespace, expected) {
            (Namespace::Function, Some(t)) => (
                ErrorCode::NoOverloadedFunDef,
                format!("no overload of `{name}` returns `{t}` for arguments ({args})"),
            ),
            (Namespace::Function, None) => (
                ErrorCode::NoOverloadedFunWithArgs,
                format!("no overload of `{name}` accepts arguments ({args})"),
            ),
            (_, Some(t)) => (
                ErrorCode::NoOpDefWithType,
                format!("no definition of operator `{name}` returns `{t}` for operands ({args})"),
            ),
            (_, None) => (
                ErrorCode::NoOpDefWithInputType,
                format!("no definition of operator `{name}` accepts operands ({args})"),
            ),
        };
        self.error(code, call.span, message);
    }

    fn ambiguous(&mut self, call: &Call, expected: Option<&Type>, count: usize) {
        let code = match (call.namespace, expected) {
            (Namespace::Function, None)    => ErrorCode::AmbiguousFunCall,
            (Namespace::Function, Some(_)) => ErrorCode::AmbiguousNestedFunCall,
            _                              => ErrorCode::AmbiguousOp,
        };
        self.error(code, call.span, format!(
            "call to {} `{}` matches {count} overloads",
            call.namespace.as_str(), call.name,
        ));
    }

    /// Argument types as far as they can be inferred alone, `?` otherwise.
    fn describe_args(&mut self, args: &[Expr]) -> String {
        let saved = (std::mem::take(&mut self.errors), std::mem::take(&mut self.tolerated));
        let types: Vec<String> = args
            .iter()
            .map(|arg| match self.check_expr(arg, None).1 {
                Some(ty) => ty.to_string(),
                None => "?".to_string(),
            })
            .collect();
        (self.errors, self.tolerated) = saved;
        types.join(", ")
    }

    fn expect(&mut self, found: &Type, expected: Option<&Type>, span: Span) {
        if let Some(expected) = expected.filter(|e| *e != found) {
            self.error(ErrorCode::TypeMismatch, span, format!("expected `{expected}`, found `{found}`"));
        }
    }

    fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        self.errors.push(Error::at(code, span, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    fn check(expr: Expr, expected: Option<&Type>) -> (Checked, Vec<ErrorCode>) {
        let table = SymbolTable::new("main");
        let mut diag = Diagnostics::new();
        let mut resolver = TypeResolver::new(&table, builtins::shared(), &mut diag);
        let checked = resolver.check_expr(&expr, expected);
        let codes = resolver.errors.iter().map(|e| e.code).collect();
        (checked, codes)
    }

    fn infix(name: &str, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Call(Call { namespace: Namespace::Infix, name: name.into(), args: vec![lhs, rhs], span: Span::new(1, 1) })
    }

    #[test]
    fn empty_list_without_context() {
        let (_, codes) = check(Expr::EmptyList(None, Span::default()), None);
        assert_eq!(codes, vec![ErrorCode::EmptyListNeedsType]);
    }

    #[test]
    fn operator_without_expected_type() {
        let expr = infix("+", Expr::Bool(true, Span::default()), Expr::Int(1, Span::default()));
        let ((expr, ty), codes) = check(expr, None);
        assert_eq!(codes, vec![ErrorCode::NoOpDefWithInputType]);
        assert!(ty.is_none());
        assert!(matches!(expr, Expr::Call(_)));
    }

    #[test]
    fn comparison_binds_by_operand_type() {
        let expr = infix("==", Expr::Char('a', Span::default()), Expr::Char('b', Span::default()));
        let ((expr, ty), codes) = check(expr, None);
        assert!(codes.is_empty());
        assert_eq!(ty, Some(Type::BOOL));
        let Expr::Typed(call) = expr else { panic!("expected a bound call") };
        assert_eq!(call.overload, 1);
        assert_eq!(call.module.as_deref(), Some(builtins::BUILTIN_MODULE));
    }

    #[test]
    fn failed_candidates_leave_no_errors() {
        // the `Char` overload fails without reporting
        let call = Expr::Call(Call {
            namespace: Namespace::Function,
            name: "print".into(),
            args: vec![Expr::Int(3, Span::default())],
            span: Span::default(),
        });
        let (_, codes) = check(call, None);
        assert!(codes.is_empty());
    }

    #[test]
    fn long_operator_chain_checks_in_one_pass() {
        let expr = (2..=64).fold(Expr::Int(1, Span::default()), |lhs, n| infix("+", lhs, Expr::Int(n, Span::default())));
        let ((expr, ty), codes) = check(expr, Some(&Type::INT));
        assert!(codes.is_empty());
        assert_eq!(ty, Some(Type::INT));
        assert!(matches!(expr, Expr::Typed(_)));
    }

    #[test]
    fn rebinding_is_stable() {
        let expr = infix("*", Expr::Int(2, Span::default()), Expr::Int(3, Span::default()));
        let ((once, _), _) = check(expr, Some(&Type::INT));
        let ((twice, ty), codes) = check(once.clone(), Some(&Type::INT));
        assert!(codes.is_empty());
        assert_eq!(ty, Some(Type::INT));
        assert_eq!(once.to_string(), twice.to_string());
    }
}
