pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

use crate::error::Error;

/// Lex and parse source text into an unresolved tree.
pub fn parse(source: &str) -> Result<ast::Program, Vec<Error>> {
    let tokens = lexer::Lexer::new(source).tokenize()?;
    parser::Parser::new(tokens).parse()
}
