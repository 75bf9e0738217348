//! Source rendering for raw and resolved trees.
//!
//! Output re-parses to an equivalent tree: infix calls are fully parenthesised
//! and unfixed operand sequences parenthesise nested sequences.

use std::fmt::{self, Display, Formatter, Write};

use crate::syntax::ast::*;

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(b)    => f.write_str(b.as_str()),
            Type::Tuple(a, b) => write!(f, "({a}, {b})"),
            Type::List(e)     => write!(f, "[{e}]"),
            Type::Syn(name)   => f.write_str(name),
        }
    }
}

impl Display for FnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for param in &self.params {
            write!(f, "{param} ")?;
        }
        write!(f, "-> {}", self.ret)
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference.name())?;
        for field in &self.fields {
            write!(f, ".{}", field.as_str())?;
        }
        Ok(())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n, _)  => write!(f, "{n}"),
            Expr::Char(c, _) => write!(f, "'{}'", escape(*c, '\'')),
            Expr::Bool(b, _) => f.write_str(if *b { "True" } else { "False" }),
            Expr::Str(s, _) => {
                f.write_char('"')?;
                for c in s.chars() {
                    f.write_str(&escape(c, '"'))?;
                }
                f.write_char('"')
            }
            Expr::EmptyList(..)    => f.write_str("[]"),
            Expr::Tuple(a, b, _)   => write!(f, "({a}, {b})"),
            Expr::Var(v)           => write!(f, "{v}"),
            Expr::Flat(flat) => {
                for (i, operand) in flat.operands.iter().enumerate() {
                    if let Some(op) = i.checked_sub(1).and_then(|j| flat.ops.get(j)) {
                        write!(f, " {} ", op.name)?;
                    }
                    write_operand(f, operand)?;
                }
                Ok(())
            }
            Expr::Call(c)  => write_call(f, c.namespace, &c.name, &c.args),
            Expr::Typed(t) => write_call(f, t.namespace, &t.name, &t.args),
        }
    }
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Flat(_) => write!(f, "({expr})"),
        _ => write!(f, "{expr}"),
    }
}

fn write_call(f: &mut Formatter<'_>, namespace: Namespace, name: &str, args: &[Expr]) -> fmt::Result {
    match (namespace, args) {
        (Namespace::Prefix, [arg]) => {
            write!(f, "{name} ")?;
            write_operand(f, arg)
        }
        (Namespace::Infix, [lhs, rhs]) => {
            f.write_char('(')?;
            write_operand(f, lhs)?;
            write!(f, " {name} ")?;
            write_operand(f, rhs)?;
            f.write_char(')')
        }
        _ => {
            write!(f, "{name}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 { f.write_str(", ")?; }
                write!(f, "{arg}")?;
            }
            f.write_char(')')
        }
    }
}

fn escape(c: char, quote: char) -> String {
    match c {
        '\n' => "\\n".into(),
        '\t' => "\\t".into(),
        '\r' => "\\r".into(),
        '\0' => "\\0".into(),
        '\\' => "\\\\".into(),
        c if c == quote => format!("\\{c}"),
        c => c.to_string(),
    }
}

// ─── Statements and items ────────────────────────────────────────────────────

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut printer = Printer::default();
        printer.program(self);
        f.write_str(&printer.out)
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: impl Display) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        // writing into a String cannot fail
        let _ = writeln!(self.out, "{text}");
    }

    fn program(&mut self, program: &Program) {
        for import in &program.imports {
            self.import(import);
        }
        for (i, item) in program.items.iter().enumerate() {
            if i > 0 || !program.imports.is_empty() {
                self.out.push('\n');
            }
            self.item(item);
        }
    }

    fn import(&mut self, import: &ImportDecl) {
        match &import.names {
            ImportNames::All => self.line(format_args!("from {} importall;", import.module)),
            ImportNames::Specific(names) => {
                let list: Vec<String> = names
                    .iter()
                    .map(|n| match &n.alias {
                        Some(alias) => format!("{} as {}", n.name.text, alias.text),
                        None => n.name.text.clone(),
                    })
                    .collect();
                self.line(format_args!("from {} import {};", import.module, list.join(", ")));
            }
        }
    }

    fn item(&mut self, item: &Item) {
        match item {
            Item::TypeSyn(t) => self.line(format_args!("type {} = {};", t.name, t.ty)),
            Item::Var(v) => self.var_decl(v),
            Item::Fn(func) => self.fn_def(func),
        }
    }

    fn var_decl(&mut self, v: &VarDecl) {
        match &v.ty {
            Some(ty) => self.line(format_args!("{ty} {} = {};", v.name, v.init)),
            None => self.line(format_args!("var {} = {};", v.name, v.init)),
        }
    }

    fn fn_def(&mut self, func: &FnDef) {
        let mut head = match func.kind {
            FnKind::Function => func.name.clone(),
            FnKind::Prefix => format!("prefix {} ", func.name),
            FnKind::Infix(fixity) => format!("{fixity} {} ", func.name),
        };
        let params: Vec<&str> = func.params.iter().map(|p| p.name.as_str()).collect();
        let _ = write!(head, "({})", params.join(", "));
        if let Some(sig) = &func.sig {
            let _ = write!(head, " :: {sig}");
        }
        self.block(head, &func.body);
    }

    fn block(&mut self, head: impl Display, body: &[Stmt]) {
        self.line(format_args!("{head} {{"));
        self.indent += 1;
        for stmt in body {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(v) => self.var_decl(v),
            Stmt::Assign(a) => self.line(format_args!("{} = {};", a.target, a.value)),
            Stmt::If(i) => {
                for (n, branch) in i.branches.iter().enumerate() {
                    let kw = if n == 0 { "if" } else { "elif" };
                    self.block(format_args!("{kw} ({})", branch.cond), &branch.body);
                }
                if let Some(body) = &i.else_body {
                    self.block("else", body);
                }
            }
            Stmt::While(w) => self.block(format_args!("while ({})", w.cond), &w.body),
            Stmt::For(l) => self.block(format_args!("for ({} in {})", l.var, l.iterable), &l.body),
            Stmt::Return(Some(e), _) => self.line(format_args!("return {e};")),
            Stmt::Return(None, _) => self.line("return;"),
            Stmt::Break(_) => self.line("break;"),
            Stmt::Continue(_) => self.line("continue;"),
            Stmt::Expr(e) => self.line(format_args!("{e};")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::syntax::parse;

    fn reprint(src: &str) -> String {
        parse(src).expect("parse failed").to_string()
    }

    #[test]
    fn types_render_in_source_syntax() {
        let out = reprint("type P = ([Int], (Char, String));");
        assert_eq!(out.trim(), "type P = ([Int], (Char, String));");
    }

    #[test]
    fn flat_sequences_keep_operator_order() {
        let out = reprint("Int x = 1 + (2 * 3) - -y;");
        assert_eq!(out.trim(), "Int x = 1 + (2 * 3) - - y;");
    }

    #[test]
    fn literals_are_escaped() {
        let out = reprint(r#"[Char] s = "a\"b\n"; Char c = '\'';"#);
        assert!(out.contains(r#""a\"b\n""#));
        assert!(out.contains(r"'\''"));
    }

    #[test]
    fn output_reparses_to_same_text() {
        let src = "from lib import a as b, <+>;
            infixr 5 <+> (a, b) :: Int Int -> Int { return a; }
            f(xs) :: [Int] -> Bool {
                var n = 0;
                for (x in xs) { if (x.hd == 0) { break; } elif (True) { continue; } else { n = n + 1; } }
                while (n > 0) { print(n); }
                return isEmpty(xs);
            }";
        let once = reprint(src);
        let twice = reprint(&once);
        assert_eq!(once, twice);
    }
}
