use crate::syntax::ast::*;
use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind};

/// Recursive-descent parser. Infix expressions are left flat for the fixer,
/// since operator precedence is only known once imports are merged.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<Program, Vec<Error>> {
        let mut errors = Vec::new();
        let mut program = Program::default();

        while !self.is_at_end() {
            let pos_before = self.pos;

            let result = match self.peek_kind() {
                TokenKind::From => self.parse_import().map(|i| program.imports.push(i)),
                TokenKind::Type => self.parse_type_syn().map(|t| program.items.push(Item::TypeSyn(t))),
                TokenKind::Var
                | TokenKind::TypeIdent(_)
                | TokenKind::LParen
                | TokenKind::LBracket => self.parse_var_decl().map(|v| program.items.push(Item::Var(v))),
                TokenKind::Ident(_)
                | TokenKind::Prefix
                | TokenKind::Infixl
                | TokenKind::Infixr => self.parse_fn_def().map(|f| program.items.push(Item::Fn(f))),
                _ => Err(self.unexpected("a declaration")),
            };
            if let Err(e) = result {
                errors.push(e);
                self.recover();
            }

            // guarantee progress on unrecognised tokens
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() { Ok(program) } else { Err(errors) }
    }

    // ─── Imports ─────────────────────────────────────────────────────────────

    fn parse_import(&mut self) -> Result<ImportDecl, Error> {
        let span = self.span();
        self.expect(TokenKind::From)?;
        let module = self.expect_ident()?;
        let names = if self.matches(TokenKind::ImportAll) {
            ImportNames::All
        } else {
            self.expect(TokenKind::Import)?;
            let mut names = vec![self.parse_import_name()?];
            while self.matches(TokenKind::Comma) {
                names.push(self.parse_import_name()?);
            }
            ImportNames::Specific(names)
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(ImportDecl { module, names, span })
    }

    fn parse_import_name(&mut self) -> Result<ImportName, Error> {
        let span = self.span();
        let name = self.parse_name()?;
        let alias = if self.matches(TokenKind::As) { Some(self.parse_name()?) } else { None };
        Ok(ImportName { name, alias, span })
    }

    fn parse_name(&mut self) -> Result<Name, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(s)     => Ok(Name::new(s, NameKind::Ident)),
            TokenKind::TypeIdent(s) => Ok(Name::new(s, NameKind::TypeIdent)),
            TokenKind::Op(s)        => Ok(Name::new(s, NameKind::Op)),
            _ => Err(self.error_at(&tok, &format!("expected an importable name, found {}", tok.kind.describe()))),
        }
    }

    // ─── Declarations ────────────────────────────────────────────────────────

    fn parse_type_syn(&mut self) -> Result<TypeSyn, Error> {
        let span = self.span();
        self.expect(TokenKind::Type)?;
        let tok = self.advance();
        let name = match tok.kind {
            TokenKind::TypeIdent(s) => s,
            _ => return Err(self.error_at(&tok, "expected a capitalised type name")),
        };
        self.expect(TokenKind::Assign)?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(TypeSyn { name, ty, span })
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, Error> {
        let span = self.span();
        let ty = if self.matches(TokenKind::Var) { None } else { Some(self.parse_type()?) };
        let name = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let init = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(VarDecl { name, ty, init, span })
    }

    fn parse_fn_def(&mut self) -> Result<FnDef, Error> {
        let span = self.span();
        let (kind, name) = match self.peek_kind() {
            TokenKind::Prefix => {
                self.advance();
                (FnKind::Prefix, self.expect_op()?)
            }
            TokenKind::Infixl | TokenKind::Infixr => {
                let assoc = if self.advance().kind == TokenKind::Infixl { Assoc::Left } else { Assoc::Right };
                let precedence = self.expect_precedence()?;
                (FnKind::Infix(Fixity::new(assoc, precedence)), self.expect_op()?)
            }
            _ => (FnKind::Function, self.expect_ident()?),
        };

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let span = self.span();
                params.push(Param { name: self.expect_ident()?, span });
                if !self.matches(TokenKind::Comma) { break; }
            }
        }
        self.expect(TokenKind::RParen)?;

        let sig = if self.matches(TokenKind::DoubleColon) { Some(self.parse_fn_type()?) } else { None };
        let body = self.parse_block()?;
        Ok(FnDef { kind, name, params, sig, body, span })
    }

    /// `T* -> T`, after the `::`.
    fn parse_fn_type(&mut self) -> Result<FnType, Error> {
        let mut params = Vec::new();
        while !self.check(TokenKind::Arrow) && !self.is_at_end() {
            params.push(self.parse_type()?);
        }
        self.expect(TokenKind::Arrow)?;
        let ret = self.parse_type()?;
        Ok(FnType::new(params, ret))
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek_kind() {
            TokenKind::Var
            | TokenKind::TypeIdent(_)
            | TokenKind::LParen
            | TokenKind::LBracket => Ok(Stmt::VarDecl(self.parse_var_decl()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let span = self.span();
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break(span))
            }
            TokenKind::Continue => {
                let span = self.span();
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue(span))
            }
            TokenKind::Ident(_) if self.peek_next_is(TokenKind::LParen) => {
                let call = self.parse_call()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(call))
            }
            TokenKind::Ident(_) => self.parse_assign(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_assign(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let target = self.parse_variable()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Assign(Assign { target, value, span }))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let mut branches = vec![self.parse_branch(span)?];
        while self.check(TokenKind::Elif) {
            let span = self.span();
            self.advance();
            branches.push(self.parse_branch(span)?);
        }
        let else_body = if self.matches(TokenKind::Else) { Some(self.parse_block()?) } else { None };
        Ok(Stmt::If(IfStmt { branches, else_body, span }))
    }

    fn parse_branch(&mut self, span: Span) -> Result<Branch, Error> {
        let cond = self.parse_paren_expr()?;
        let body = self.parse_block()?;
        Ok(Branch { cond, body, span })
    }

    fn parse_while(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let cond = self.parse_paren_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While(WhileStmt { cond, body, span }))
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        let var = self.parse_variable()?;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::For(ForStmt { var, iterable, body, span }))
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let value = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return(value, span))
    }

    // ─── Expressions ─────────────────────────────────────────────────────────

    fn parse_paren_expr(&mut self) -> Result<Expr, Error> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    /// `unary (OP unary)*`, kept flat. A lone operand is returned as-is.
    fn parse_expr(&mut self) -> Result<Expr, Error> {
        let first = self.parse_unary()?;
        if !matches!(self.peek_kind(), TokenKind::Op(_)) {
            return Ok(first);
        }
        let span = first.span();
        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let TokenKind::Op(name) = self.peek_kind() {
            let span = self.span();
            self.advance();
            ops.push(OpToken { name, span });
            operands.push(self.parse_unary()?);
        }
        Ok(Expr::Flat(FlatExpr { operands, ops, span }))
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        if let TokenKind::Op(name) = self.peek_kind() {
            let span = self.span();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Call(Call { namespace: Namespace::Prefix, name, args: vec![operand], span }));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Int(n)  => { self.advance(); Ok(Expr::Int(n, span)) }
            TokenKind::Char(c) => { self.advance(); Ok(Expr::Char(c, span)) }
            TokenKind::Str(s)  => { self.advance(); Ok(Expr::Str(s, span)) }
            TokenKind::Bool(b) => { self.advance(); Ok(Expr::Bool(b, span)) }
            TokenKind::LBracket => {
                self.advance();
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::EmptyList(None, span))
            }
            TokenKind::LParen => {
                self.advance();
                let first = self.parse_expr()?;
                if self.matches(TokenKind::Comma) {
                    let second = self.parse_expr()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Tuple(Box::new(first), Box::new(second), span))
                } else {
                    self.expect(TokenKind::RParen)?;
                    Ok(first)
                }
            }
            TokenKind::Ident(_) if self.peek_next_is(TokenKind::LParen) => self.parse_call(),
            TokenKind::Ident(_) => Ok(Expr::Var(self.parse_variable()?)),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.matches(TokenKind::Comma) { break; }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call(Call { namespace: Namespace::Function, name, args, span }))
    }

    fn parse_variable(&mut self) -> Result<Variable, Error> {
        let span = self.span();
        let name = self.expect_ident()?;
        let mut var = Variable::unresolved(name, span);
        while let TokenKind::Accessor(field) = self.peek_kind() {
            self.advance();
            var.fields.push(field);
        }
        Ok(var)
    }

    // ─── Types ───────────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<Type, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::TypeIdent(name) => Ok(match BasicType::from_name(&name) {
                Some(basic) => Type::Basic(basic),
                None => Type::Syn(name),
            }),
            TokenKind::LParen => {
                let a = self.parse_type()?;
                self.expect(TokenKind::Comma)?;
                let b = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                Ok(Type::tuple(a, b))
            }
            TokenKind::LBracket => {
                let elem = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                Ok(Type::list(elem))
            }
            _ => Err(self.error_at(&tok, &format!("expected type, found {}", tok.kind.describe()))),
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_is(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.tokens[self.pos].kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::MissingToken,
                tok.line,
                tok.column,
                format!("expected {}, found {}", kind.describe(), tok.kind.describe()),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(s) => Ok(s),
            _ => Err(self.error_at(&tok, &format!("expected identifier, found {}", tok.kind.describe()))),
        }
    }

    fn expect_op(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Op(s) => Ok(s),
            _ => Err(self.error_at(&tok, &format!("expected operator, found {}", tok.kind.describe()))),
        }
    }

    fn expect_precedence(&mut self) -> Result<u8, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Int(n) => u8::try_from(n)
                .map_err(|_| self.error_at(&tok, &format!("precedence {n} out of range"))),
            _ => Err(self.error_at(&tok, &format!("expected precedence, found {}", tok.kind.describe()))),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::UnexpectedToken,
            tok.line,
            tok.column,
            format!("expected {}, found {}", expected, tok.kind.describe()),
        )
    }

    fn error_at(&self, tok: &Token, msg: &str) -> Error {
        Error::new(ErrorCode::UnexpectedToken, tok.line, tok.column, msg)
    }

    /// Skip to the next top-level declaration after a parse error.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::From | TokenKind::Type | TokenKind::Prefix
                | TokenKind::Infixl | TokenKind::Infixr if depth == 0 => break,
                _ => {}
            }
            self.advance();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
