//! Control-Flow Analyzer
//!
//! Tracks two facts per statement sequence: whether every path through it
//! returns, and whether any path does. Statements after a `return`,
//! `break`, `continue` or an `if` that returns on every branch are reported
//! once per block, at the first unreachable one.

use tracing::debug;

use crate::syntax::ast::*;
use crate::error::{Diagnostics, ErrorCode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Returns {
    pub certain: bool,
    pub exist: bool,
}

pub struct FlowAnalyzer<'a> {
    diag: &'a mut Diagnostics,
    loops: usize,
}

impl<'a> FlowAnalyzer<'a> {
    pub fn new(diag: &'a mut Diagnostics) -> Self {
        Self { diag, loops: 0 }
    }

    pub fn run(mut self, program: &Program) {
        let mut functions = 0;
        for item in &program.items {
            let Item::Fn(func) = item else { continue };
            functions += 1;
            self.loops = 0;
            let returns = self.block(&func.body);
            let needs_value = func.sig.as_ref().is_some_and(FnType::returns_value);
            if needs_value && !returns.certain {
                self.diag.add_error(ErrorCode::NotAllPathsReturn, func.span,
                    format!("not every path through `{}` returns a value", func.name));
            }
        }
        debug!(functions, "flow: done");
    }

    pub fn block(&mut self, stmts: &[Stmt]) -> Returns {
        let mut result = Returns::default();
        let mut cut: Option<ErrorCode> = None;
        let mut warned = false;

        for stmt in stmts {
            if let (Some(code), false) = (cut, warned) {
                self.diag.add_warning(code, stmt.span(), "unreachable statement");
                warned = true;
            }
            let (returns, ends) = self.stmt(stmt);
            result.exist |= returns.exist;
            if cut.is_none() {
                result.certain |= returns.certain;
                cut = ends;
            }
        }
        result
    }

    /// Flow facts of one statement, plus the warning owed to whatever follows
    /// it when it ends the block.
    fn stmt(&mut self, stmt: &Stmt) -> (Returns, Option<ErrorCode>) {
        match stmt {
            Stmt::Return(..) => (Returns { certain: true, exist: true }, Some(ErrorCode::UnreachableStmtReturn)),
            Stmt::Break(span) | Stmt::Continue(span) => {
                if self.loops == 0 {
                    let keyword = if matches!(stmt, Stmt::Break(_)) { "break" } else { "continue" };
                    self.diag.add_error(ErrorCode::BreakOutsideLoop, *span,
                        format!("`{keyword}` outside of a loop"));
                }
                (Returns::default(), Some(ErrorCode::UnreachableStmtContBreak))
            }
            Stmt::If(i) => {
                let mut certain = i.else_body.is_some();
                let mut exist = false;
                let bodies = i.branches.iter().map(|b| &b.body).chain(i.else_body.as_ref());
                for body in bodies {
                    let r = self.block(body);
                    certain &= r.certain;
                    exist |= r.exist;
                }
                let ends = certain.then_some(ErrorCode::UnreachableStmtBranches);
                (Returns { certain, exist }, ends)
            }
            Stmt::While(WhileStmt { body, .. }) | Stmt::For(ForStmt { body, .. }) => {
                self.loops += 1;
                let r = self.block(body);
                self.loops -= 1;
                (Returns { certain: false, exist: r.exist }, None)
            }
            Stmt::VarDecl(_) | Stmt::Assign(_) | Stmt::Expr(_) => (Returns::default(), None),
        }
    }
}
