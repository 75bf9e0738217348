use indexmap::IndexMap;

use crate::syntax::ast::{FnType, Span, Type};

pub use crate::syntax::ast::{Assoc, Fixity, Namespace};

pub type FunctionKey = (Namespace, String);

// ─── Entries ──────────────────────────────────────────────────────────────────

/// A declared variable: global, argument or local.
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub ty: Type,
    pub span: Span,
}

impl VarInfo {
    pub fn new(ty: Type, span: Span) -> Self {
        Self { ty, span }
    }
}

#[derive(Debug, Clone)]
pub enum OverloadOrigin {
    /// Defined in the module being compiled.
    Local {
        /// Index of the defining item in `Program::items`.
        item: usize,
        fixity: Option<Fixity>,
        args: IndexMap<String, VarInfo>,
        /// Filled by the name resolver, in declaration order.
        locals: IndexMap<String, VarInfo>,
    },
    /// Merged from a header or the built-in library.
    External {
        module: String,
        original: String,
        fixity: Option<Fixity>,
        /// Whether the callable may appear in a global initializer.
        constant: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Overload {
    pub ty: FnType,
    pub span: Span,
    pub origin: OverloadOrigin,
}

impl Overload {
    pub fn fixity(&self) -> Option<Fixity> {
        match &self.origin {
            OverloadOrigin::Local { fixity, .. } | OverloadOrigin::External { fixity, .. } => *fixity,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.origin, OverloadOrigin::Local { .. })
    }

    /// Owning module, `None` for the current one.
    pub fn module(&self) -> Option<&str> {
        match &self.origin {
            OverloadOrigin::Local { .. } => None,
            OverloadOrigin::External { module, .. } => Some(module),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.origin, OverloadOrigin::External { constant: true, .. })
    }
}

/// An entry of an External Table's global or synonym namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSymbol {
    pub module: String,
    pub original: String,
    pub ty: Type,
}

// ─── SymbolTable ──────────────────────────────────────────────────────────────

/// Declarations of the module being compiled. Insertion order is source order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub module: String,
    pub globals: IndexMap<String, VarInfo>,
    pub functions: IndexMap<FunctionKey, Vec<Overload>>,
    pub type_syns: IndexMap<String, VarInfo>,
}

impl SymbolTable {
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into(), ..Self::default() }
    }

    /// Returns the span of the earlier declaration on redeclaration.
    pub fn declare_global(&mut self, name: &str, var: VarInfo) -> Result<(), Span> {
        if let Some(existing) = self.globals.get(name) {
            return Err(existing.span);
        }
        self.globals.insert(name.to_string(), var);
        Ok(())
    }

    pub fn declare_type_syn(&mut self, name: &str, syn: VarInfo) -> Result<(), Span> {
        if let Some(existing) = self.type_syns.get(name) {
            return Err(existing.span);
        }
        self.type_syns.insert(name.to_string(), syn);
        Ok(())
    }

    /// Appends an overload unless one with an identical type exists, whose index is returned.
    pub fn add_overload(&mut self, namespace: Namespace, name: &str, overload: Overload) -> Result<usize, usize> {
        let set = self.functions.entry((namespace, name.to_string())).or_default();
        if let Some(i) = set.iter().position(|o| o.ty == overload.ty) {
            return Err(i);
        }
        set.push(overload);
        Ok(set.len() - 1)
    }

    pub fn overloads(&self, namespace: Namespace, name: &str) -> &[Overload] {
        self.functions.get(&(namespace, name.to_string())).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn overload_for_item(&self, item: usize) -> Option<&Overload> {
        self.functions.values().flatten().find(|o| matches!(o.origin, OverloadOrigin::Local { item: i, .. } if i == item))
    }

    pub fn overload_for_item_mut(&mut self, item: usize) -> Option<&mut Overload> {
        self.functions
            .values_mut()
            .flatten()
            .find(|o| matches!(o.origin, OverloadOrigin::Local { item: i, .. } if i == item))
    }

    pub fn fixity_of(&self, op: &str) -> Option<Fixity> {
        self.overloads(Namespace::Infix, op).iter().find_map(Overload::fixity)
    }

    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.globals.get_index_of(name)
    }
}

// ─── ExternalTable ────────────────────────────────────────────────────────────

/// Imported and built-in declarations, keyed by the name effective in the importing module.
#[derive(Debug, Clone, Default)]
pub struct ExternalTable {
    pub globals: IndexMap<String, ExternalSymbol>,
    pub functions: IndexMap<FunctionKey, Vec<Overload>>,
    pub type_syns: IndexMap<String, ExternalSymbol>,
}

impl ExternalTable {
    pub fn new() -> Self { Self::default() }

    /// Re-inserting the same symbol from the same module is a no-op.
    /// A different symbol under the same name is returned as the clash.
    pub fn insert_global(&mut self, name: &str, symbol: ExternalSymbol) -> Result<(), &ExternalSymbol> {
        insert_symbol(&mut self.globals, name, symbol)
    }

    pub fn insert_type_syn(&mut self, name: &str, symbol: ExternalSymbol) -> Result<(), &ExternalSymbol> {
        insert_symbol(&mut self.type_syns, name, symbol)
    }

    /// Returns `false` when an identical overload from the same module is already present.
    pub fn push_overload(&mut self, namespace: Namespace, name: &str, overload: Overload) -> bool {
        let set = self.functions.entry((namespace, name.to_string())).or_default();
        let duplicate = set.iter().any(|o| {
            o.ty == overload.ty && o.module() == overload.module() && same_original(o, &overload)
        });
        if !duplicate {
            set.push(overload);
        }
        !duplicate
    }

    pub fn overloads(&self, namespace: Namespace, name: &str) -> &[Overload] {
        self.functions.get(&(namespace, name.to_string())).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fixity_of(&self, op: &str) -> Option<Fixity> {
        self.overloads(Namespace::Infix, op).iter().find_map(Overload::fixity)
    }

    pub fn syn_type(&self, name: &str) -> Option<&Type> {
        self.type_syns.get(name).map(|s| &s.ty)
    }
}

fn insert_symbol<'t>(
    map: &'t mut IndexMap<String, ExternalSymbol>,
    name: &str,
    symbol: ExternalSymbol,
) -> Result<(), &'t ExternalSymbol> {
    if map.contains_key(name) {
        let existing = &map[name];
        if existing.module == symbol.module && existing.original == symbol.original {
            return Ok(());
        }
        return Err(existing);
    }
    map.insert(name.to_string(), symbol);
    Ok(())
}

fn same_original(a: &Overload, b: &Overload) -> bool {
    match (&a.origin, &b.origin) {
        (OverloadOrigin::External { original: x, .. }, OverloadOrigin::External { original: y, .. }) => x == y,
        _ => false,
    }
}
