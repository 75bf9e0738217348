use crate::syntax::ast::{Assoc, Fixity, FnType, Namespace, Type};
use super::Export;

// ─── Type helpers ─────────────────────────────────────────────────────────────

fn infix(name: &'static str, precedence: u8, assoc: Assoc, lhs: Type, rhs: Type, ret: Type) -> Export {
    Export {
        namespace: Namespace::Infix,
        name,
        fixity: Some(Fixity::new(assoc, precedence)),
        ty: FnType::new(vec![lhs, rhs], ret),
        constant: true,
    }
}

fn prefix(name: &'static str, operand: Type, ret: Type) -> Export {
    Export { namespace: Namespace::Prefix, name, fixity: None, ty: FnType::new(vec![operand], ret), constant: true }
}

/// Same-typed operands for every listed operand type.
fn homogeneous(name: &'static str, precedence: u8, operands: &[Type], ret: impl Fn(&Type) -> Type) -> Vec<Export> {
    operands
        .iter()
        .map(|t| infix(name, precedence, Assoc::Left, t.clone(), t.clone(), ret(t)))
        .collect()
}

// ─── Exports ──────────────────────────────────────────────────────────────────

pub fn exports() -> Vec<Export> {
    let mut out = vec![
        infix("||", 2, Assoc::Left, Type::BOOL, Type::BOOL, Type::BOOL),
        infix("&&", 3, Assoc::Left, Type::BOOL, Type::BOOL, Type::BOOL),
    ];

    let equatable = [Type::INT, Type::CHAR, Type::BOOL];
    let ordered = [Type::INT, Type::CHAR];
    for op in ["==", "!="] {
        out.extend(homogeneous(op, 4, &equatable, |_| Type::BOOL));
    }
    for op in ["<", "<=", ">", ">="] {
        out.extend(homogeneous(op, 4, &ordered, |_| Type::BOOL));
    }

    for elem in super::element_types() {
        let list = Type::list(elem.clone());
        out.push(infix(":", 5, Assoc::Right, elem, list.clone(), list));
    }

    for op in ["+", "-"] {
        out.extend(homogeneous(op, 6, &[Type::INT], Type::clone));
    }
    for op in ["*", "/", "%"] {
        out.extend(homogeneous(op, 7, &[Type::INT], Type::clone));
    }

    out.push(prefix("-", Type::INT, Type::INT));
    out.push(prefix("!", Type::BOOL, Type::BOOL));
    out
}
