use crate::syntax::ast::{FnType, Namespace, Type};
use super::Export;

fn f(name: &'static str, params: Vec<Type>, ret: Type, constant: bool) -> Export {
    Export { namespace: Namespace::Function, name, fixity: None, ty: FnType::new(params, ret), constant }
}

pub fn exports() -> Vec<Export> {
    let mut out = vec![
        // I/O
        f("print", vec![Type::INT],  Type::VOID, false),
        f("print", vec![Type::CHAR], Type::VOID, false),
        f("read",  vec![],           Type::CHAR, false),

        // Conversions
        f("ord",   vec![Type::CHAR], Type::INT,  true),
        f("chr",   vec![Type::INT],  Type::CHAR, true),
    ];
    for elem in super::element_types() {
        out.push(f("isEmpty", vec![Type::list(elem)], Type::BOOL, false));
    }
    out
}
