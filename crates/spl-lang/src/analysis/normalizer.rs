//! Type normalization.
//!
//! Expands every synonym reference into its structural type and rejects
//! `Void` anywhere but as a bare return type. Runs over imported headers
//! (from the merger) and over the module itself, so later passes compare
//! types structurally and never see `Type::Syn`.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Diagnostics, Error, ErrorCode};
use crate::header::Header;
use crate::syntax::ast::*;
use super::symbols::{ExternalTable, SymbolTable, VarInfo};

// ─── Expansion ────────────────────────────────────────────────────────────────

/// Where synonym definitions come from.
pub trait SynonymSource {
    /// Definition of `name`, and whether it was imported.
    fn lookup(&self, name: &str) -> Option<(&Type, bool)>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpandError {
    Cycle { name: String, external: bool },
    Undefined(String),
}

impl ExpandError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Cycle { external: false, .. } => ErrorCode::CyclicTypeSyn,
            Self::Cycle { external: true, .. } => ErrorCode::CyclicTypeSynExternal,
            Self::Undefined(_) => ErrorCode::UndefinedType,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Cycle { name, .. } => format!("type synonym `{name}` is defined in terms of itself"),
            Self::Undefined(name) => format!("undefined type `{name}`"),
        }
    }
}

pub fn expand(ty: &Type, syns: &dyn SynonymSource) -> Result<Type, ExpandError> {
    expand_with(ty, syns, &mut Vec::new())
}

/// Expands the definition of synonym `name` with `name` already on the chain.
pub fn expand_synonym(name: &str, syns: &dyn SynonymSource) -> Result<Type, ExpandError> {
    let (def, _) = syns.lookup(name).ok_or_else(|| ExpandError::Undefined(name.to_string()))?;
    expand_with(def, syns, &mut vec![name.to_string()])
}

fn expand_with(ty: &Type, syns: &dyn SynonymSource, chain: &mut Vec<String>) -> Result<Type, ExpandError> {
    match ty {
        Type::Basic(_) => Ok(ty.clone()),
        Type::Tuple(a, b) => Ok(Type::tuple(expand_with(a, syns, chain)?, expand_with(b, syns, chain)?)),
        Type::List(e) => Ok(Type::list(expand_with(e, syns, chain)?)),
        Type::Syn(name) => {
            let (def, external) = syns.lookup(name).ok_or_else(|| ExpandError::Undefined(name.clone()))?;
            if chain.iter().any(|n| n == name) {
                return Err(ExpandError::Cycle { name: name.clone(), external });
            }
            chain.push(name.clone());
            let expanded = expand_with(def, syns, chain);
            chain.pop();
            expanded
        }
    }
}

/// Local definitions first, then imported and built-in ones.
struct ModuleSynonyms<'a> {
    local: &'a IndexMap<String, Type>,
    external: &'a ExternalTable,
}

impl SynonymSource for ModuleSynonyms<'_> {
    fn lookup(&self, name: &str) -> Option<(&Type, bool)> {
        match self.local.get(name) {
            Some(ty) => Some((ty, false)),
            None => self.external.syn_type(name).map(|ty| (ty, true)),
        }
    }
}

/// A header's own definitions, then the built-in ones.
struct HeaderSynonyms<'a> {
    own: &'a IndexMap<String, Type>,
    builtins: &'a ExternalTable,
}

impl SynonymSource for HeaderSynonyms<'_> {
    fn lookup(&self, name: &str) -> Option<(&Type, bool)> {
        self.own.get(name).or_else(|| self.builtins.syn_type(name)).map(|ty| (ty, true))
    }
}

// ─── Headers ──────────────────────────────────────────────────────────────────

/// Normalizes every entry of an imported header. Entries that fail are
/// reported at `span` (the import) and dropped.
pub fn normalize_header(mut header: Header, builtins: &ExternalTable, diag: &mut Diagnostics, span: Span) -> Header {
    let own: IndexMap<String, Type> = header.type_syns.iter().cloned().collect();
    let syns = HeaderSynonyms { own: &own, builtins };
    let module = header.module.clone();

    let mut report = |what: &str, err: ExpandError| {
        diag.add_error(err.code(), span, format!("in `{module}` {what}: {}", err.message()));
    };

    header.type_syns = own
        .keys()
        .filter_map(|name| match expand_synonym(name, &syns) {
            Ok(ty) => Some((name.clone(), ty)),
            Err(e) => {
                report(&format!("synonym `{name}`"), e);
                None
            }
        })
        .collect();
    header.globals.retain_mut(|(name, ty)| match expand(ty, &syns) {
        Ok(expanded) => {
            *ty = expanded;
            true
        }
        Err(e) => {
            report(&format!("global `{name}`"), e);
            false
        }
    });
    header.functions.retain_mut(|f| {
        let params: Result<Vec<Type>, ExpandError> = f.ty.params.iter().map(|p| expand(p, &syns)).collect();
        match params.and_then(|params| Ok(FnType::new(params, expand(&f.ty.ret, &syns)?))) {
            Ok(ty) => {
                f.ty = ty;
                true
            }
            Err(e) => {
                report(&format!("{} `{}`", f.namespace.as_str(), f.name), e);
                false
            }
        }
    });
    header
}

// ─── Module pass ──────────────────────────────────────────────────────────────

pub struct Normalizer<'a> {
    externals: &'a ExternalTable,
    diag: &'a mut Diagnostics,
    /// Raw local definitions, captured before any is rewritten.
    raw: IndexMap<String, Type>,
}

impl<'a> Normalizer<'a> {
    pub fn new(externals: &'a ExternalTable, diag: &'a mut Diagnostics) -> Self {
        Self { externals, diag, raw: IndexMap::new() }
    }

    /// Declares and expands local synonyms in `table`, then rewrites every
    /// annotation in `program` into structural form.
    pub fn run(mut self, program: &mut Program, table: &mut SymbolTable) {
        debug!(items = program.items.len(), "normalizer: start");
        self.declare_synonyms(program, table);
        self.raw = table.type_syns.iter().map(|(n, v)| (n.clone(), v.ty.clone())).collect();

        for item in &mut program.items {
            match item {
                Item::TypeSyn(syn) => self.normalize_synonym(syn, table),
                Item::Var(var) => self.normalize_global(var),
                Item::Fn(func) => self.normalize_fn(func),
            }
        }
        debug!(synonyms = table.type_syns.len(), "normalizer: done");
    }

    fn declare_synonyms(&mut self, program: &Program, table: &mut SymbolTable) {
        for item in &program.items {
            let Item::TypeSyn(syn) = item else { continue };
            if let Some(imported) = self.externals.type_syns.get(&syn.name) {
                self.diag.add_error(ErrorCode::ClashImportType, syn.span, format!(
                    "type synonym `{}` clashes with `{}` imported from `{}`",
                    syn.name, imported.original, imported.module,
                ));
                continue;
            }
            if let Err(first) = table.declare_type_syn(&syn.name, VarInfo::new(syn.ty.clone(), syn.span)) {
                self.diag.push(Error::at(ErrorCode::DuplicateTypeSyn, syn.span,
                    format!("type synonym `{}` is already defined", syn.name)).with_related(first));
            }
        }
    }

    fn normalize_synonym(&mut self, syn: &mut TypeSyn, table: &mut SymbolTable) {
        // only the declaration that made it into the table is expanded
        let Some(entry) = table.type_syns.get_mut(&syn.name) else { return };
        if entry.span != syn.span {
            return;
        }
        let source = ModuleSynonyms { local: &self.raw, external: self.externals };
        match expand_synonym(&syn.name, &source) {
            Ok(ty) => {
                if ty.contains_void() {
                    self.diag.add_error(ErrorCode::TypeSynVoid, syn.span,
                        format!("type synonym `{}` contains `Void`", syn.name));
                }
                entry.ty = ty.clone();
                syn.ty = ty;
            }
            Err(e) => self.diag.add_error(e.code(), syn.span, e.message()),
        }
    }

    /// Expands an annotation at a use site. Cycles were already reported at
    /// the synonym's declaration.
    fn normalize_at(&mut self, ty: &Type, span: Span) -> Option<Type> {
        let source = ModuleSynonyms { local: &self.raw, external: self.externals };
        match expand(ty, &source) {
            Ok(t) => Some(t),
            Err(e @ ExpandError::Undefined(_)) => {
                self.diag.add_error(e.code(), span, e.message());
                None
            }
            Err(ExpandError::Cycle { .. }) => None,
        }
    }

    fn normalize_global(&mut self, var: &mut VarDecl) {
        let Some(ty) = &var.ty else {
            self.diag.add_error(ErrorCode::GlobalVarNeedsType, var.span,
                format!("global `{}` needs an explicit type", var.name));
            return;
        };
        if let Some(ty) = self.normalize_at(&ty.clone(), var.span) {
            if ty.contains_void() {
                self.diag.add_error(ErrorCode::GlobalVarVoid, var.span,
                    format!("global `{}` cannot have a type containing `Void`", var.name));
            }
            var.ty = Some(ty);
        }
    }

    fn normalize_fn(&mut self, func: &mut FnDef) {
        self.check_params(func);

        if let Some(sig) = func.sig.take() {
            func.sig = Some(self.normalize_sig(func, sig));
        } else {
            self.diag.add_error(ErrorCode::FunNeedsType, func.span,
                format!("{} `{}` needs a type signature", func.kind.namespace().as_str(), func.name));
        }

        let mut body = std::mem::take(&mut func.body);
        self.normalize_block(&mut body);
        func.body = body;
    }

    fn check_params(&mut self, func: &FnDef) {
        for (i, param) in func.params.iter().enumerate() {
            if let Some(first) = func.params[..i].iter().find(|p| p.name == param.name) {
                self.diag.push(Error::at(ErrorCode::DuplicateArg, param.span,
                    format!("parameter `{}` of `{}` is declared twice", param.name, func.name)).with_related(first.span));
            }
        }
        let expected = match func.kind {
            FnKind::Function => None,
            FnKind::Prefix => Some(1),
            FnKind::Infix(_) => Some(2),
        };
        if let Some(n) = expected.filter(|&n| n != func.params.len()) {
            self.diag.add_error(ErrorCode::OpArity, func.span, format!(
                "{} `{}` takes {n} parameter(s), found {}",
                func.kind.namespace().as_str(), func.name, func.params.len(),
            ));
        }
    }

    fn normalize_sig(&mut self, func: &FnDef, sig: FnType) -> FnType {
        if sig.params.len() != func.params.len() {
            self.diag.add_error(ErrorCode::FunArityMismatch, func.span, format!(
                "`{}` has {} parameter(s) but its signature lists {}",
                func.name, func.params.len(), sig.params.len(),
            ));
        }

        let mut params = Vec::with_capacity(sig.params.len());
        for (i, raw) in sig.params.iter().enumerate() {
            let ty = self.normalize_at(raw, func.span).unwrap_or_else(|| raw.clone());
            if ty.contains_void() {
                let name = func.params.get(i).map_or("?", |p| p.name.as_str());
                self.diag.add_error(ErrorCode::FunParamVoid, func.span,
                    format!("parameter `{name}` of `{}` cannot have a type containing `Void`", func.name));
            }
            params.push(ty);
        }

        let ret = self.normalize_at(&sig.ret, func.span).unwrap_or(sig.ret);
        if !ret.is_void() && ret.contains_void() {
            self.diag.add_error(ErrorCode::FunReturnNestedVoid, func.span,
                format!("return type of `{}` nests `Void`", func.name));
        }
        FnType::new(params, ret)
    }

    fn normalize_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::VarDecl(var) => self.normalize_local(var),
                Stmt::If(i) => {
                    for branch in &mut i.branches {
                        self.normalize_block(&mut branch.body);
                    }
                    if let Some(body) = &mut i.else_body {
                        self.normalize_block(body);
                    }
                }
                Stmt::While(w) => self.normalize_block(&mut w.body),
                Stmt::For(f) => self.normalize_block(&mut f.body),
                _ => {}
            }
        }
    }

    fn normalize_local(&mut self, var: &mut VarDecl) {
        let Some(ty) = var.ty.clone() else {
            self.diag.add_error(ErrorCode::LocalVarNeedsType, var.span,
                format!("local `{}` needs an explicit type", var.name));
            return;
        };
        if let Some(ty) = self.normalize_at(&ty, var.span) {
            if ty.contains_void() {
                self.diag.add_error(ErrorCode::LocalVarVoid, var.span,
                    format!("local `{}` cannot have a type containing `Void`", var.name));
            }
            var.ty = Some(ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(defs: &[(&str, Type)]) -> IndexMap<String, Type> {
        defs.iter().map(|(n, t)| (n.to_string(), t.clone())).collect()
    }

    #[test]
    fn expands_nested_synonyms() {
        let defs = local(&[("P", Type::tuple(Type::INT, Type::Syn("Q".into()))), ("Q", Type::list(Type::CHAR))]);
        let ext = ExternalTable::new();
        let src = ModuleSynonyms { local: &defs, external: &ext };
        assert_eq!(
            expand(&Type::Syn("P".into()), &src).unwrap(),
            Type::tuple(Type::INT, Type::list(Type::CHAR))
        );
    }

    #[test]
    fn mutual_cycle_terminates() {
        let defs = local(&[("A", Type::Syn("B".into())), ("B", Type::list(Type::Syn("A".into())))]);
        let ext = ExternalTable::new();
        let src = ModuleSynonyms { local: &defs, external: &ext };
        assert_eq!(
            expand_synonym("A", &src),
            Err(ExpandError::Cycle { name: "A".into(), external: false })
        );
    }

    #[test]
    fn unknown_synonym() {
        let defs = IndexMap::new();
        let ext = ExternalTable::new();
        let src = ModuleSynonyms { local: &defs, external: &ext };
        assert_eq!(expand(&Type::Syn("Nope".into()), &src), Err(ExpandError::Undefined("Nope".into())));
    }

    #[test]
    fn header_cycles_are_external() {
        let own = local(&[("A", Type::Syn("A".into()))]);
        let builtins = ExternalTable::new();
        let src = HeaderSynonyms { own: &own, builtins: &builtins };
        assert_eq!(expand_synonym("A", &src).unwrap_err().code(), ErrorCode::CyclicTypeSynExternal);
    }

    #[test]
    fn repeated_synonym_is_not_a_cycle() {
        let defs = local(&[("I", Type::INT)]);
        let ext = ExternalTable::new();
        let src = ModuleSynonyms { local: &defs, external: &ext };
        let pair = Type::tuple(Type::Syn("I".into()), Type::Syn("I".into()));
        assert_eq!(expand(&pair, &src).unwrap(), Type::tuple(Type::INT, Type::INT));
    }
}
