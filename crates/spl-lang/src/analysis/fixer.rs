//! Expression Fixer
//!
//! Rebuilds binary operator trees from the flat operand/operator sequences
//! the parser leaves behind, by precedence climbing over the fixities of
//! every visible infix operator. A sequence containing an operator with no
//! definition is reported and left flat. Prefix operators are already bound
//! by the parser; here they are only checked to exist.

use std::iter::Peekable;
use std::vec::IntoIter;

use tracing::debug;

use crate::syntax::ast::*;
use crate::error::{Diagnostics, ErrorCode};
use super::symbols::{ExternalTable, SymbolTable};

pub struct Fixer<'a> {
    table: &'a SymbolTable,
    externals: &'a ExternalTable,
    diag: &'a mut Diagnostics,
    fixed: usize,
}

impl<'a> Fixer<'a> {
    pub fn new(table: &'a SymbolTable, externals: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { table, externals, diag, fixed: 0 }
    }

    pub fn run(mut self, program: &mut Program) {
        for item in &mut program.items {
            match item {
                Item::Var(var) => self.fix_in_place(&mut var.init),
                Item::Fn(func) => self.fix_block(&mut func.body),
                Item::TypeSyn(_) => {}
            }
        }
        debug!(sequences = self.fixed, "fixer: done");
    }

    fn fix_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::VarDecl(var) => self.fix_in_place(&mut var.init),
                Stmt::Assign(a) => self.fix_in_place(&mut a.value),
                Stmt::If(i) => {
                    for branch in &mut i.branches {
                        self.fix_in_place(&mut branch.cond);
                        self.fix_block(&mut branch.body);
                    }
                    if let Some(body) = &mut i.else_body {
                        self.fix_block(body);
                    }
                }
                Stmt::While(w) => {
                    self.fix_in_place(&mut w.cond);
                    self.fix_block(&mut w.body);
                }
                Stmt::For(f) => {
                    self.fix_in_place(&mut f.iterable);
                    self.fix_block(&mut f.body);
                }
                Stmt::Return(Some(e), _) | Stmt::Expr(e) => self.fix_in_place(e),
                Stmt::Return(None, _) | Stmt::Break(_) | Stmt::Continue(_) => {}
            }
        }
    }

    fn fix_in_place(&mut self, expr: &mut Expr) {
        let placeholder = Expr::EmptyList(None, expr.span());
        let taken = std::mem::replace(expr, placeholder);
        *expr = self.fix(taken);
    }

    /// Consumes an expression and returns it with every flat sequence inside
    /// turned into nested infix calls.
    pub fn fix(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Flat(flat) => self.fix_flat(flat),
            Expr::Call(mut call) => {
                if call.namespace == Namespace::Prefix {
                    self.check_prefix(&call);
                }
                call.args = call.args.into_iter().map(|a| self.fix(a)).collect();
                Expr::Call(call)
            }
            Expr::Typed(mut call) => {
                call.args = call.args.into_iter().map(|a| self.fix(a)).collect();
                Expr::Typed(call)
            }
            Expr::Tuple(a, b, span) => Expr::Tuple(Box::new(self.fix(*a)), Box::new(self.fix(*b)), span),
            other => other,
        }
    }

    fn fix_flat(&mut self, flat: FlatExpr) -> Expr {
        let operands: Vec<Expr> = flat.operands.into_iter().map(|e| self.fix(e)).collect();

        let mut fixities = Vec::with_capacity(flat.ops.len());
        for op in &flat.ops {
            match self.fixity_of(&op.name) {
                Some(fixity) => fixities.push(fixity),
                None => self.diag.add_error(ErrorCode::UndefinedOp, op.span,
                    format!("undefined infix operator `{}`", op.name)),
            }
        }
        if fixities.len() != flat.ops.len() || operands.len() != flat.ops.len() + 1 {
            return Expr::Flat(FlatExpr { operands, ops: flat.ops, span: flat.span });
        }

        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            return Expr::Flat(FlatExpr { operands: Vec::new(), ops: flat.ops, span: flat.span });
        };
        let rest: Vec<Operation> = flat
            .ops
            .into_iter()
            .zip(fixities)
            .zip(operands)
            .map(|((op, fixity), rhs)| Operation { op, fixity, rhs })
            .collect();
        self.fixed += 1;
        climb(first, 0, &mut rest.into_iter().peekable())
    }

    fn fixity_of(&self, op: &str) -> Option<Fixity> {
        self.table.fixity_of(op).or_else(|| self.externals.fixity_of(op))
    }

    fn check_prefix(&mut self, call: &Call) {
        let defined = !self.table.overloads(Namespace::Prefix, &call.name).is_empty()
            || !self.externals.overloads(Namespace::Prefix, &call.name).is_empty();
        if !defined {
            self.diag.add_error(ErrorCode::UndefinedOp, call.span,
                format!("undefined prefix operator `{}`", call.name));
        }
    }
}

// ── Precedence climbing ───────────────────────────────────────────────────────

/// An infix operator paired with the operand to its right.
struct Operation {
    op: OpToken,
    fixity: Fixity,
    rhs: Expr,
}

fn climb(mut lhs: Expr, min: u16, rest: &mut Peekable<IntoIter<Operation>>) -> Expr {
    while rest.peek().is_some_and(|next| u16::from(next.fixity.precedence) >= min) {
        let Some(Operation { op, fixity, rhs }) = rest.next() else { break };
        let next_min = match fixity.assoc {
            Assoc::Left => u16::from(fixity.precedence) + 1,
            Assoc::Right => u16::from(fixity.precedence),
        };
        let rhs = climb(rhs, next_min, rest);
        lhs = Expr::Call(Call { namespace: Namespace::Infix, name: op.name, args: vec![lhs, rhs], span: op.span });
    }
    lhs
}
