pub mod symbols;
pub mod normalizer;
pub mod imports;
pub mod collector;
pub mod names;
pub mod fixer;
pub mod lookup;
pub mod checker;
pub mod flow;


use tracing::debug;

use crate::builtins;
use crate::config::CompileOptions;
use crate::error::{Diagnostics, Error};
use crate::header::{self, HeaderError, Headers};
use crate::syntax::ast::Program;
use checker::TypeResolver;
use collector::Collector;
use fixer::Fixer;
use flow::FlowAnalyzer;
use imports::{ImportMerger, Imported};
use names::NameResolver;
use normalizer::Normalizer;
pub use symbols::{ExternalTable, SymbolTable};

// ─── Result ───────────────────────────────────────────────────────────────────

/// A fully resolved module, ready for code generation.
#[derive(Debug, Clone)]
pub struct ResolveResult {
    /// Only resolved references and bound calls remain.
    pub program: Program,
    pub symbol_table: SymbolTable,
    pub externals: ExternalTable,
    /// Imported modules, each once, in first-import order.
    pub modules: Vec<String>,
    pub warnings: Vec<Error>,
}

impl ResolveResult {
    /// The header other modules import this one through.
    pub fn header(&self) -> Result<String, HeaderError> {
        header::emit(&self.symbol_table)
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Full resolver pipeline, with a checkpoint after each stage:
/// 1. imports: ImportMerger builds the External Table from headers + built-ins
/// 2. types  : Normalizer expands synonyms, Collector fills the local table
/// 3. names  : NameResolver tags every variable reference with its scope
/// 4. fixity : Fixer rebuilds operator trees
/// 5. check  : TypeResolver binds every call to one overload
/// 6. flow   : FlowAnalyzer checks returns and reachability
///
/// On failure every diagnostic recorded so far is returned, warnings included.
pub fn resolve(
    mut program: Program,
    headers: &Headers,
    options: &CompileOptions,
) -> Result<ResolveResult, Vec<Error>> {
    debug!(module = %options.module, imports = program.imports.len(), items = program.items.len(), "resolve: start");
    let mut diag = Diagnostics::new().deny_warnings(options.warnings_as_errors);

    // ── Stage 1: imports ──────────────────────────────────────────────────────
    let Imported { externals, modules } =
        ImportMerger::new(headers, builtins::shared(), &mut diag).merge(&program.imports);
    diag.checkpoint("imports")?;

    // ── Stage 2: types ────────────────────────────────────────────────────────
    let mut table = SymbolTable::new(options.module.clone());
    Normalizer::new(&externals, &mut diag).run(&mut program, &mut table);
    Collector::new(&externals, &mut diag).collect(&program, &mut table);
    diag.checkpoint("types")?;

    // ── Stage 3: names ────────────────────────────────────────────────────────
    NameResolver::new(&mut table, &externals, &mut diag).run(&mut program);
    diag.checkpoint("names")?;

    // ── Stage 4: fixity ───────────────────────────────────────────────────────
    Fixer::new(&table, &externals, &mut diag).run(&mut program);
    diag.checkpoint("fixity")?;

    // ── Stage 5: check ────────────────────────────────────────────────────────
    TypeResolver::new(&table, &externals, &mut diag).run(&mut program);
    diag.checkpoint("check")?;

    // ── Stage 6: flow ─────────────────────────────────────────────────────────
    FlowAnalyzer::new(&mut diag).run(&program);
    diag.checkpoint("flow")?;

    Ok(ResolveResult { program, symbol_table: table, externals, modules, warnings: diag.into_entries() })
}
