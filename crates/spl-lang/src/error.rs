use thiserror::Error;
use tracing::info;

use crate::syntax::ast::Span;

/// Diagnostic kinds, grouped by the stage that raises them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lexer
    UnexpectedChar,
    UnterminatedString,
    UnterminatedChar,
    InvalidEscape,
    InvalidLiteral,

    // Parser
    UnexpectedToken,
    MissingToken,

    // Imports
    ImportModuleNotFound,
    HeaderFormatIncorrect,
    ImportUndefinedSymbol,
    ImportAliasKindMismatch,
    ClashImportGlobal,
    ClashImportType,
    ClashBuiltinType,
    DuplicateImport,
    ImportAllAndSpecific,

    // Types and declarations
    UndefinedType,
    CyclicTypeSyn,
    CyclicTypeSynExternal,
    TypeSynVoid,
    GlobalVarNeedsType,
    GlobalVarVoid,
    FunNeedsType,
    FunParamVoid,
    FunReturnNestedVoid,
    FunArityMismatch,
    OpArity,
    LocalVarNeedsType,
    LocalVarVoid,
    DuplicateArg,
    DuplicateGlobalVar,
    DuplicateTypeSyn,
    DuplicateOverload,
    FixityMismatch,

    // Names
    UndefinedVar,
    UndefinedGlobalVar,
    DuplicateVarDef,
    ShadowGlobal,
    ShadowArg,
    ShadowImportGlobal,

    // Fixity
    UndefinedOp,

    // Type checking
    UndefinedFun,
    NoOverloadedFunDef,
    NoOverloadedFunWithArgs,
    NoOpDefWithType,
    NoOpDefWithInputType,
    AmbiguousFunCall,
    AmbiguousNestedFunCall,
    AmbiguousOp,
    GlobalDefMustBeConstant,
    IllegalTupleAccessorUsage,
    IllegalListAccessorUsage,
    UnexpectedTuple,
    TypeMismatch,
    EmptyListNeedsType,
    ReturnValueInVoid,
    MissingReturnValue,

    // Control flow
    NotAllPathsReturn,
    BreakOutsideLoop,
    UnreachableStmtBranches,
    UnreachableStmtContBreak,
    UnreachableStmtReturn,
}

impl ErrorCode {
    /// Warnings never block a checkpoint unless warnings are denied.
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Self::DuplicateImport
                | Self::ImportAllAndSpecific
                | Self::ShadowGlobal
                | Self::ShadowArg
                | Self::ShadowImportGlobal
                | Self::UnreachableStmtBranches
                | Self::UnreachableStmtContBreak
                | Self::UnreachableStmtReturn
        )
    }

    /// Conditions after which no further analysis of the module is useful.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ImportModuleNotFound | Self::HeaderFormatIncorrect)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedChar            => "UnexpectedChar",
            Self::UnterminatedString        => "UnterminatedString",
            Self::UnterminatedChar          => "UnterminatedChar",
            Self::InvalidEscape             => "InvalidEscape",
            Self::InvalidLiteral            => "InvalidLiteral",
            Self::UnexpectedToken           => "UnexpectedToken",
            Self::MissingToken              => "MissingToken",
            Self::ImportModuleNotFound      => "ImportModuleNotFound",
            Self::HeaderFormatIncorrect     => "HeaderFormatIncorrect",
            Self::ImportUndefinedSymbol     => "ImportUndefinedSymbol",
            Self::ImportAliasKindMismatch   => "ImportAliasKindMismatch",
            Self::ClashImportGlobal         => "ClashImportGlobal",
            Self::ClashImportType           => "ClashImportType",
            Self::ClashBuiltinType          => "ClashBuiltinType",
            Self::DuplicateImport           => "DuplicateImport",
            Self::ImportAllAndSpecific      => "ImportAllAndSpecific",
            Self::UndefinedType             => "UndefinedType",
            Self::CyclicTypeSyn             => "CyclicTypeSyn",
            Self::CyclicTypeSynExternal     => "CyclicTypeSynExternal",
            Self::TypeSynVoid               => "TypeSynVoid",
            Self::GlobalVarNeedsType        => "GlobalVarNeedsType",
            Self::GlobalVarVoid             => "GlobalVarVoid",
            Self::FunNeedsType              => "FunNeedsType",
            Self::FunParamVoid              => "FunParamVoid",
            Self::FunReturnNestedVoid       => "FunReturnNestedVoid",
            Self::FunArityMismatch          => "FunArityMismatch",
            Self::OpArity                   => "OpArity",
            Self::LocalVarNeedsType         => "LocalVarNeedsType",
            Self::LocalVarVoid              => "LocalVarVoid",
            Self::DuplicateArg              => "DuplicateArg",
            Self::DuplicateGlobalVar        => "DuplicateGlobalVar",
            Self::DuplicateTypeSyn          => "DuplicateTypeSyn",
            Self::DuplicateOverload         => "DuplicateOverload",
            Self::FixityMismatch            => "FixityMismatch",
            Self::UndefinedVar              => "UndefinedVar",
            Self::UndefinedGlobalVar        => "UndefinedGlobalVar",
            Self::DuplicateVarDef           => "DuplicateVarDef",
            Self::ShadowGlobal              => "ShadowGlobal",
            Self::ShadowArg                 => "ShadowArg",
            Self::ShadowImportGlobal        => "ShadowImportGlobal",
            Self::UndefinedOp               => "UndefinedOp",
            Self::UndefinedFun              => "UndefinedFun",
            Self::NoOverloadedFunDef        => "NoOverloadedFunDef",
            Self::NoOverloadedFunWithArgs   => "NoOverloadedFunWithArgs",
            Self::NoOpDefWithType           => "NoOpDefWithType",
            Self::NoOpDefWithInputType      => "NoOpDefWithInputType",
            Self::AmbiguousFunCall          => "AmbiguousFunCall",
            Self::AmbiguousNestedFunCall    => "AmbiguousNestedFunCall",
            Self::AmbiguousOp               => "AmbiguousOp",
            Self::GlobalDefMustBeConstant   => "GlobalDefMustBeConstant",
            Self::IllegalTupleAccessorUsage => "IllegalTupleAccessorUsage",
            Self::IllegalListAccessorUsage  => "IllegalListAccessorUsage",
            Self::UnexpectedTuple           => "UnexpectedTuple",
            Self::TypeMismatch              => "TypeMismatch",
            Self::EmptyListNeedsType        => "EmptyListNeedsType",
            Self::ReturnValueInVoid         => "ReturnValueInVoid",
            Self::MissingReturnValue        => "MissingReturnValue",
            Self::NotAllPathsReturn         => "NotAllPathsReturn",
            Self::BreakOutsideLoop          => "BreakOutsideLoop",
            Self::UnreachableStmtBranches   => "UnreachableStmtBranches",
            Self::UnreachableStmtContBreak  => "UnreachableStmtContBreak",
            Self::UnreachableStmtReturn     => "UnreachableStmtReturn",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Diagnostic ───────────────────────────────────────────────────────────────

/// One position-tagged diagnostic. `related` points at other nodes involved,
/// e.g. the declaration a shadowing definition hides.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {line}:{column}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub related: Vec<Span>,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into(), related: Vec::new() }
    }

    pub fn at(code: ErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(code, span.line, span.column, message)
    }

    pub fn with_related(mut self, span: Span) -> Self {
        self.related.push(span);
        self
    }

    pub fn is_error(&self) -> bool { self.code.is_error() }
}

// ─── Sink ─────────────────────────────────────────────────────────────────────

/// Append-only diagnostic sink threaded through every stage of one compilation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Error>,
    fatal: bool,
    deny_warnings: bool,
}

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    pub fn deny_warnings(mut self, deny: bool) -> Self {
        self.deny_warnings = deny;
        self
    }

    pub fn push(&mut self, error: Error) {
        if error.code.is_fatal() {
            self.fatal = true;
        }
        self.entries.push(error);
    }

    pub fn add_error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        debug_assert!(code.is_error(), "{code} is a warning");
        self.push(Error::at(code, span, message));
    }

    pub fn add_warning(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        debug_assert!(!code.is_error(), "{code} is an error");
        self.push(Error::at(code, span, message));
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.is_error())
    }

    pub fn is_fatal(&self) -> bool { self.fatal }

    pub fn entries(&self) -> &[Error] { &self.entries }

    /// Stage barrier: hands back every diagnostic recorded so far if any of them blocks.
    pub fn checkpoint(&mut self, stage: &str) -> Result<(), Vec<Error>> {
        let errors = self.entries.iter().filter(|e| e.is_error()).count();
        let warnings = self.entries.len() - errors;
        let blocked = self.fatal || errors > 0 || (self.deny_warnings && warnings > 0);
        if blocked {
            info!(stage, errors, warnings, fatal = self.fatal, "checkpoint failed");
            Err(std::mem::take(&mut self.entries))
        } else {
            info!(stage, warnings, "checkpoint passed");
            Ok(())
        }
    }

    pub fn into_entries(self) -> Vec<Error> { self.entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_pass_checkpoint() {
        let mut diag = Diagnostics::new();
        diag.add_warning(ErrorCode::ShadowArg, Span::new(1, 1), "shadow");
        assert!(diag.checkpoint("names").is_ok());
        assert_eq!(diag.entries().len(), 1);
    }

    #[test]
    fn errors_block_checkpoint_and_drain() {
        let mut diag = Diagnostics::new();
        diag.add_warning(ErrorCode::ShadowArg, Span::new(1, 1), "shadow");
        diag.add_error(ErrorCode::UndefinedVar, Span::new(2, 3), "undefined: `x`");
        let drained = diag.checkpoint("names").unwrap_err();
        assert_eq!(drained.len(), 2);
        assert!(diag.entries().is_empty());
    }

    #[test]
    fn denied_warnings_block() {
        let mut diag = Diagnostics::new().deny_warnings(true);
        diag.add_warning(ErrorCode::UnreachableStmtReturn, Span::new(4, 1), "unreachable");
        assert!(diag.checkpoint("flow").is_err());
    }

    #[test]
    fn fatal_codes_mark_sink() {
        let mut diag = Diagnostics::new();
        diag.add_error(ErrorCode::HeaderFormatIncorrect, Span::new(1, 1), "bad header");
        assert!(diag.is_fatal());
    }

    #[test]
    fn located_errors_keep_position_and_related_spans() {
        let e = Error::at(ErrorCode::ShadowGlobal, Span::new(5, 9), "shadows global `x`").with_related(Span::new(1, 1));
        assert_eq!((e.line, e.column), (5, 9));
        assert_eq!(e.related, vec![Span::new(1, 1)]);
        assert!(!e.is_error());
    }

    #[test]
    fn display_format() {
        let e = Error::new(ErrorCode::UndefinedVar, 3, 7, "undefined: `y`");
        assert_eq!(e.to_string(), "[UndefinedVar] 3:7: undefined: `y`");
    }
}
