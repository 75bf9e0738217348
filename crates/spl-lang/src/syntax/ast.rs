use serde::{Deserialize, Serialize};

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Namespaces and fixity ───────────────────────────────────────────────────

/// Callables live in three disjoint namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Function,
    Prefix,
    Infix,
}

impl Namespace {
    pub fn is_operator(&self) -> bool {
        !matches!(self, Self::Function)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Prefix   => "prefix operator",
            Self::Infix    => "infix operator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixity {
    pub assoc: Assoc,
    pub precedence: u8,
}

impl Fixity {
    pub fn new(assoc: Assoc, precedence: u8) -> Self {
        Self { assoc, precedence }
    }
}

impl std::fmt::Display for Fixity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kw = match self.assoc { Assoc::Left => "infixl", Assoc::Right => "infixr" };
        write!(f, "{kw} {}", self.precedence)
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub items: Vec<Item>,
}

/// `from m import a, b as c;` or `from m importall;`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub module: String,
    pub names: ImportNames,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ImportNames {
    All,
    Specific(Vec<ImportName>),
}

#[derive(Debug, Clone)]
pub struct ImportName {
    pub name: Name,
    pub alias: Option<Name>,
    pub span: Span,
}

impl ImportName {
    /// The identifier the symbol is known by inside the importing module.
    pub fn effective(&self) -> &Name {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

/// Lexical category of an importable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Ident,
    TypeIdent,
    Op,
}

impl NameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ident     => "identifier",
            Self::TypeIdent => "type identifier",
            Self::Op        => "operator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub text: String,
    pub kind: NameKind,
}

impl Name {
    pub fn new(text: impl Into<String>, kind: NameKind) -> Self {
        Self { text: text.into(), kind }
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    TypeSyn(TypeSyn),
    Var(VarDecl),
    Fn(FnDef),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Self::TypeSyn(t) => t.span,
            Self::Var(v)     => v.span,
            Self::Fn(f)      => f.span,
        }
    }
}

/// `type Point = (Int, Int);`
#[derive(Debug, Clone)]
pub struct TypeSyn {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

// ─── Functions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    Function,
    Prefix,
    Infix(Fixity),
}

impl FnKind {
    pub fn namespace(&self) -> Namespace {
        match self {
            Self::Function => Namespace::Function,
            Self::Prefix   => Namespace::Prefix,
            Self::Infix(_) => Namespace::Infix,
        }
    }

    pub fn fixity(&self) -> Option<Fixity> {
        match self {
            Self::Infix(f) => Some(*f),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FnDef {
    pub kind: FnKind,
    pub name: String,
    pub params: Vec<Param>,
    pub sig: Option<FnType>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `Int x = 1;` or `var x = 1;`
    VarDecl(VarDecl),
    /// `x.fst = 1;`
    Assign(Assign),
    /// `if (c) { } elif (d) { } else { }`
    If(IfStmt),
    /// `while (c) { }`
    While(WhileStmt),
    /// `for (x in xs) { }`
    For(ForStmt),
    /// `return e;` or bare `return;`
    Return(Option<Expr>, Span),
    Break(Span),
    Continue(Span),
    /// A call used as a statement.
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::VarDecl(v)   => v.span,
            Self::Assign(a)    => a.span,
            Self::If(i)        => i.span,
            Self::While(w)     => w.span,
            Self::For(f)       => f.span,
            Self::Return(_, s) => *s,
            Self::Break(s)     => *s,
            Self::Continue(s)  => *s,
            Self::Expr(e)      => e.span(),
        }
    }
}

/// Shared by globals and locals. `ty` is `None` when declared with `var`.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<Type>,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub target: Variable,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    /// The `if` branch followed by every `elif`, in source order.
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub var: Variable,
    pub iterable: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, Span),
    Char(char, Span),
    Bool(bool, Span),
    Str(String, Span),
    /// `[]`, annotated with its list type once checked.
    EmptyList(Option<Type>, Span),
    Tuple(Box<Expr>, Box<Expr>, Span),
    Var(Variable),
    /// Operand/operator sequence awaiting fixity resolution.
    Flat(FlatExpr),
    /// Call not yet bound to an overload.
    Call(Call),
    /// Call bound to exactly one overload.
    Typed(TypedCall),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Int(_, s)
            | Self::Char(_, s)
            | Self::Bool(_, s)
            | Self::Str(_, s)
            | Self::EmptyList(_, s)
            | Self::Tuple(_, _, s) => *s,
            Self::Var(v)   => v.span,
            Self::Flat(f)  => f.span,
            Self::Call(c)  => c.span,
            Self::Typed(t) => t.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlatExpr {
    /// Always one more operand than operators.
    pub operands: Vec<Expr>,
    pub ops: Vec<OpToken>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct OpToken {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub namespace: Namespace,
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypedCall {
    pub namespace: Namespace,
    /// Name as written at the call site (possibly an import alias).
    pub name: String,
    /// Name in the defining module.
    pub original: String,
    /// Index into the overload set of the owning table.
    pub overload: usize,
    /// `None` when the overload is defined in the current module.
    pub module: Option<String>,
    pub returns_value: bool,
    pub ty: Type,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub reference: Reference,
    pub fields: Vec<Field>,
    /// Accessor-narrowed type, filled in by the checker.
    pub ty: Option<Type>,
    pub span: Span,
}

impl Variable {
    pub fn unresolved(name: impl Into<String>, span: Span) -> Self {
        Self { reference: Reference::Unresolved(name.into()), fields: Vec::new(), ty: None, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Unresolved(String),
    Global { module: Option<String>, name: String, original: String },
    NonGlobal { scope: Scope, name: String },
}

impl Reference {
    /// The identifier as written in this module.
    pub fn name(&self) -> &str {
        match self {
            Self::Unresolved(n) => n,
            Self::Global { name, .. } => name,
            Self::NonGlobal { name, .. } => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Arg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hd,
    Tl,
    Fst,
    Snd,
}

impl Field {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "hd"  => Some(Self::Hd),
            "tl"  => Some(Self::Tl),
            "fst" => Some(Self::Fst),
            "snd" => Some(Self::Snd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd  => "hd",
            Self::Tl  => "tl",
            Self::Fst => "fst",
            Self::Snd => "snd",
        }
    }
}

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Int,
    Bool,
    Char,
    Void,
}

impl BasicType {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Int"  => Some(Self::Int),
            "Bool" => Some(Self::Bool),
            "Char" => Some(Self::Char),
            "Void" => Some(Self::Void),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int  => "Int",
            Self::Bool => "Bool",
            Self::Char => "Char",
            Self::Void => "Void",
        }
    }
}

/// Structural type expression. `Syn` only survives until normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Basic(BasicType),
    Tuple(Box<Type>, Box<Type>),
    List(Box<Type>),
    Syn(String),
}

impl Type {
    pub const INT: Type = Type::Basic(BasicType::Int);
    pub const BOOL: Type = Type::Basic(BasicType::Bool);
    pub const CHAR: Type = Type::Basic(BasicType::Char);
    pub const VOID: Type = Type::Basic(BasicType::Void);

    pub fn list(elem: Type) -> Self {
        Self::List(Box::new(elem))
    }

    pub fn tuple(a: Type, b: Type) -> Self {
        Self::Tuple(Box::new(a), Box::new(b))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Basic(BasicType::Void))
    }

    /// True if `Void` occurs anywhere in the tree, including at the root.
    pub fn contains_void(&self) -> bool {
        match self {
            Self::Basic(b)    => *b == BasicType::Void,
            Self::Tuple(a, b) => a.contains_void() || b.contains_void(),
            Self::List(e)     => e.contains_void(),
            Self::Syn(_)      => false,
        }
    }
}

/// Function type: ordered parameter types plus return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FnType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }

    pub fn returns_value(&self) -> bool {
        !self.ret.is_void()
    }
}
