pub mod syntax;
pub mod analysis;
pub mod builtins;
pub mod config;
pub mod error;
pub mod header;

pub use analysis::{ResolveResult, SymbolTable};
pub use config::CompileOptions;
pub use error::{Diagnostics, Error, ErrorCode};
pub use header::Headers;
pub use syntax::token::{Token, TokenKind};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Parse and resolve a module that imports nothing but the built-ins.
pub fn compile(source: &str) -> Result<ResolveResult, Vec<Error>> {
    compile_with(source, &Headers::new(), &CompileOptions::default())
}

/// Parse and resolve a module against the given headers of its imports.
pub fn compile_with(source: &str, headers: &Headers, options: &CompileOptions) -> Result<ResolveResult, Vec<Error>> {
    let program = syntax::parse(source)?;
    analysis::resolve(program, headers, options)
}
