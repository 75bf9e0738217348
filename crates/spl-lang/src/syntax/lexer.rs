use crate::error::{Error, ErrorCode};
use crate::syntax::ast::Field;
use crate::syntax::token::{Token, TokenKind, bool_or_type_ident, keyword_or_ident};

/// Characters that may form a user-definable operator.
pub const OPERATOR_CHARS: &str = "+-*/%<>=!&|:^~@$?";

pub fn is_operator_char(ch: char) -> bool {
    OPERATOR_CHARS.contains(ch)
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self { source: source.chars().collect(), pos: 0, line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(Some(tok)) => tokens.push(tok),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        let line = self.line;
        let col = self.column;

        if self.peek() == '/' && matches!(self.peek_next(), '/' | '*') {
            self.advance();
            if self.advance() == '/' { self.skip_line(); } else { self.skip_block_comment(); }
            return Ok(None);
        }

        let ch = self.advance();
        let kind = match ch {
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,

            '.' => TokenKind::Accessor(self.read_accessor(line, col)?),
            '\'' => TokenKind::Char(self.read_char(line, col)?),
            '"' => TokenKind::Str(self.read_string(line, col)?),
            '0'..='9' => TokenKind::Int(self.read_int(ch, line, col)?),
            'a'..='z' | '_' => keyword_or_ident(self.read_word(ch)),
            'A'..='Z' => bool_or_type_ident(self.read_word(ch)),

            c if is_operator_char(c) => {
                let op = self.read_op(c);
                match op.as_str() {
                    "="  => TokenKind::Assign,
                    "::" => TokenKind::DoubleColon,
                    "->" => TokenKind::Arrow,
                    _    => TokenKind::Op(op),
                }
            }

            other => {
                return Err(Error::new(ErrorCode::UnexpectedChar, line, col,
                    format!("unexpected character `{other}`")));
            }
        };

        Ok(Some(Token::new(kind, line, col)))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> char {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == '\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> char {
        self.source.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.pos + 1).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' { self.advance(); }
    }

    fn skip_block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                break;
            }
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_op(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while is_operator_char(self.peek()) {
            // a comment opener ends the operator
            if self.peek() == '/' && matches!(self.peek_next(), '/' | '*') { break; }
            s.push(self.advance());
        }
        s
    }

    fn read_word(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            s.push(self.advance());
        }
        s
    }

    fn read_int(&mut self, first: char, line: usize, col: usize) -> Result<i64, Error> {
        let mut s = String::from(first);
        while self.peek().is_ascii_digit() {
            s.push(self.advance());
        }
        s.parse().map_err(|_| Error::new(ErrorCode::InvalidLiteral, line, col,
            format!("integer literal `{s}` does not fit in 64 bits")))
    }

    fn read_accessor(&mut self, line: usize, col: usize) -> Result<Field, Error> {
        let mut word = String::new();
        while self.peek().is_ascii_alphabetic() {
            word.push(self.advance());
        }
        Field::from_name(&word).ok_or_else(|| Error::new(ErrorCode::UnexpectedChar, line, col,
            format!("unknown accessor `.{word}`, expected one of .hd .tl .fst .snd")))
    }

    fn read_escape(&mut self, line: usize, col: usize) -> Result<char, Error> {
        let esc_line = self.line;
        let esc_col = self.column;
        if self.is_at_end() {
            return Err(Error::new(ErrorCode::UnterminatedChar, line, col, "unterminated escape"));
        }
        match self.advance() {
            'n'  => Ok('\n'),
            't'  => Ok('\t'),
            'r'  => Ok('\r'),
            '0'  => Ok('\0'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"'  => Ok('"'),
            other => Err(Error::new(ErrorCode::InvalidEscape, esc_line, esc_col,
                format!("unknown escape sequence `\\{other}`"))),
        }
    }

    fn read_char(&mut self, line: usize, col: usize) -> Result<char, Error> {
        if self.is_at_end() || matches!(self.peek(), '\n' | '\'') {
            return Err(Error::new(ErrorCode::UnterminatedChar, line, col,
                "empty or unterminated character literal"));
        }
        let ch = match self.advance() {
            '\\' => self.read_escape(line, col)?,
            c => c,
        };
        if self.peek() != '\'' {
            return Err(Error::new(ErrorCode::UnterminatedChar, line, col,
                "unterminated character literal"));
        }
        self.advance();
        Ok(ch)
    }

    fn read_string(&mut self, line: usize, col: usize) -> Result<String, Error> {
        let mut s = String::new();
        let mut error: Option<Error> = None;
        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(Error::new(ErrorCode::UnterminatedString, line, col,
                    "unterminated string literal"));
            }
            match self.advance() {
                '"' => break,
                '\\' => match self.read_escape(line, col) {
                    Ok(c) => s.push(c),
                    // keep consuming so the rest of the string does not cascade
                    Err(e) => { error.get_or_insert(e); }
                },
                c => s.push(c),
            }
        }
        match error {
            Some(e) => Err(e),
            None => Ok(s),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
