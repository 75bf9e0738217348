//! The built-in library, merged into every module's External Table under
//! the synthetic module name [`BUILTIN_MODULE`].

pub mod functions;
pub mod operators;

use std::sync::OnceLock;

use crate::analysis::symbols::{ExternalSymbol, ExternalTable, Overload, OverloadOrigin};
use crate::syntax::ast::{Fixity, FnType, Namespace, Span, Type};

pub const BUILTIN_MODULE: &str = "__builtin__";

// ─── Export ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Export {
    pub namespace: Namespace,
    pub name: &'static str,
    pub fixity: Option<Fixity>,
    pub ty: FnType,
    /// Usable in global initializers.
    pub constant: bool,
}

impl Export {
    fn overload(&self) -> Overload {
        Overload {
            ty: self.ty.clone(),
            span: Span::default(),
            origin: OverloadOrigin::External {
                module: BUILTIN_MODULE.to_string(),
                original: self.name.to_string(),
                fixity: self.fixity,
                constant: self.constant,
            },
        }
    }
}

/// Element types `:` and `isEmpty` are defined for: basic values, lists of
/// them and pairs of them. Deeper structures need user-defined functions.
pub fn element_types() -> Vec<Type> {
    let basic = [Type::INT, Type::CHAR, Type::BOOL];
    let lists = basic.iter().cloned().map(Type::list);
    let pairs = basic.iter().flat_map(|a| basic.iter().map(move |b| Type::tuple(a.clone(), b.clone())));
    basic.iter().cloned().chain(lists).chain(pairs).collect()
}

pub fn type_syn_exports() -> Vec<(&'static str, Type)> {
    vec![("String", Type::list(Type::CHAR))]
}

// ─── Table ────────────────────────────────────────────────────────────────────

/// Builds a fresh table of every built-in symbol.
pub fn standard() -> ExternalTable {
    let mut table = ExternalTable::new();
    for (name, ty) in type_syn_exports() {
        let symbol = ExternalSymbol { module: BUILTIN_MODULE.into(), original: name.into(), ty };
        // names are unique within the built-in list
        let _ = table.insert_type_syn(name, symbol);
    }
    for export in operators::exports().into_iter().chain(functions::exports()) {
        table.push_overload(export.namespace, export.name, export.overload());
    }
    table
}

/// Process-wide read-only copy of [`standard`].
pub fn shared() -> &'static ExternalTable {
    static TABLE: OnceLock<ExternalTable> = OnceLock::new();
    TABLE.get_or_init(standard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::Assoc;

    #[test]
    fn print_has_two_overloads() {
        let print = shared().overloads(Namespace::Function, "print");
        assert_eq!(print.len(), 2);
        assert!(print.iter().all(|o| !o.is_constant() && o.ty.ret.is_void()));
    }

    #[test]
    fn operator_fixities() {
        let t = shared();
        assert_eq!(t.fixity_of("*"), Some(Fixity::new(Assoc::Left, 7)));
        assert_eq!(t.fixity_of("+"), Some(Fixity::new(Assoc::Left, 6)));
        assert_eq!(t.fixity_of(":"), Some(Fixity::new(Assoc::Right, 5)));
        assert_eq!(t.fixity_of("=="), Some(Fixity::new(Assoc::Left, 4)));
        assert_eq!(t.fixity_of("||"), Some(Fixity::new(Assoc::Left, 2)));
    }

    #[test]
    fn minus_lives_in_both_operator_namespaces() {
        let t = shared();
        assert_eq!(t.overloads(Namespace::Infix, "-").len(), 1);
        assert_eq!(t.overloads(Namespace::Prefix, "-").len(), 1);
    }

    #[test]
    fn cons_and_is_empty_cover_structured_elements() {
        let t = shared();
        let cons = t.overloads(Namespace::Infix, ":");
        let is_empty = t.overloads(Namespace::Function, "isEmpty");
        assert_eq!(cons.len(), element_types().len());
        assert_eq!(is_empty.len(), element_types().len());

        let strings = Type::list(Type::list(Type::CHAR));
        assert!(cons.iter().any(|o| o.ty.ret == strings));
        let pairs = Type::list(Type::tuple(Type::INT, Type::BOOL));
        assert!(is_empty.iter().any(|o| o.ty.params == [pairs.clone()]));
    }

    #[test]
    fn string_synonym() {
        assert_eq!(shared().syn_type("String"), Some(&Type::list(Type::CHAR)));
    }
}
