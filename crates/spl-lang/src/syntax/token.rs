use crate::syntax::ast::Field;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Char(char),
    Str(String),
    Bool(bool),

    // Names
    Ident(String),     // starts lowercase: variables, functions, modules
    TypeIdent(String), // starts uppercase: basic types and synonyms
    Op(String),        // maximal run of operator characters
    Accessor(Field),   // .hd .tl .fst .snd

    // Keywords
    Var,
    Type,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Return,
    Break,
    Continue,
    From,
    Import,
    ImportAll,
    As,
    Prefix,
    Infixl,
    Infixr,

    // Reserved operator spellings
    Assign,      // =
    DoubleColon, // ::
    Arrow,       // ->

    // Punctuation
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Char(_) | Self::Str(_) | Self::Bool(_))
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Var | Self::Type | Self::If | Self::Elif | Self::Else | Self::While | Self::For
            | Self::In | Self::Return | Self::Break | Self::Continue | Self::From | Self::Import
            | Self::ImportAll | Self::As | Self::Prefix | Self::Infixl | Self::Infixr
        )
    }

    /// Short human-readable form used in parser diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Int(n)        => format!("integer `{n}`"),
            Self::Char(c)       => format!("character {c:?}"),
            Self::Str(s)        => format!("string {s:?}"),
            Self::Bool(b)       => format!("`{}`", if *b { "True" } else { "False" }),
            Self::Ident(s)      => format!("identifier `{s}`"),
            Self::TypeIdent(s)  => format!("type `{s}`"),
            Self::Op(s)         => format!("operator `{s}`"),
            Self::Accessor(f)   => format!("accessor `.{}`", f.as_str()),
            Self::Assign        => "`=`".into(),
            Self::DoubleColon   => "`::`".into(),
            Self::Arrow         => "`->`".into(),
            Self::Comma         => "`,`".into(),
            Self::Semicolon     => "`;`".into(),
            Self::LParen        => "`(`".into(),
            Self::RParen        => "`)`".into(),
            Self::LBrace        => "`{`".into(),
            Self::RBrace        => "`}`".into(),
            Self::LBracket      => "`[`".into(),
            Self::RBracket      => "`]`".into(),
            Self::Eof           => "end of input".into(),
            kw                  => format!("keyword `{}`", keyword_text(kw).unwrap_or("?")),
        }
    }
}

/// Maps a lowercase word to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "var"       => TokenKind::Var,
        "type"      => TokenKind::Type,
        "if"        => TokenKind::If,
        "elif"      => TokenKind::Elif,
        "else"      => TokenKind::Else,
        "while"     => TokenKind::While,
        "for"       => TokenKind::For,
        "in"        => TokenKind::In,
        "return"    => TokenKind::Return,
        "break"     => TokenKind::Break,
        "continue"  => TokenKind::Continue,
        "from"      => TokenKind::From,
        "import"    => TokenKind::Import,
        "importall" => TokenKind::ImportAll,
        "as"        => TokenKind::As,
        "prefix"    => TokenKind::Prefix,
        "infixl"    => TokenKind::Infixl,
        "infixr"    => TokenKind::Infixr,
        _           => TokenKind::Ident(s),
    }
}

/// Capitalised words: boolean literals or type identifiers.
pub fn bool_or_type_ident(s: String) -> TokenKind {
    match s.as_str() {
        "True"  => TokenKind::Bool(true),
        "False" => TokenKind::Bool(false),
        _       => TokenKind::TypeIdent(s),
    }
}

fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Var       => "var",
        TokenKind::Type      => "type",
        TokenKind::If        => "if",
        TokenKind::Elif      => "elif",
        TokenKind::Else      => "else",
        TokenKind::While     => "while",
        TokenKind::For       => "for",
        TokenKind::In        => "in",
        TokenKind::Return    => "return",
        TokenKind::Break     => "break",
        TokenKind::Continue  => "continue",
        TokenKind::From      => "from",
        TokenKind::Import    => "import",
        TokenKind::ImportAll => "importall",
        TokenKind::As        => "as",
        TokenKind::Prefix    => "prefix",
        TokenKind::Infixl    => "infixl",
        TokenKind::Infixr    => "infixr",
        _ => return None,
    })
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
