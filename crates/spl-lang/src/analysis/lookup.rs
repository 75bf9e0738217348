//! Lookups shared by the type checker.
//!
//! - Narrowing a variable's declared type through its accessor chain
//! - Gathering the overloads visible for a call, local ones first

use crate::error::ErrorCode;
use crate::syntax::ast::{Field, Namespace, Type};
use super::symbols::{ExternalTable, Overload, OverloadOrigin, SymbolTable};

#[derive(Debug, Clone, PartialEq)]
pub struct AccessError {
    pub code: ErrorCode,
    pub message: String,
}

/// Applies `.hd .tl .fst .snd` in order.
pub fn narrow(ty: &Type, fields: &[Field]) -> Result<Type, AccessError> {
    let mut current = ty.clone();
    for field in fields {
        current = match (field, current) {
            (Field::Fst, Type::Tuple(a, _)) => *a,
            (Field::Snd, Type::Tuple(_, b)) => *b,
            (Field::Hd, Type::List(e)) => *e,
            (Field::Tl, list @ Type::List(_)) => list,
            (Field::Fst | Field::Snd, other) => {
                return Err(AccessError {
                    code: ErrorCode::IllegalTupleAccessorUsage,
                    message: format!("`.{}` needs a tuple, found `{other}`", field.as_str()),
                });
            }
            (Field::Hd | Field::Tl, other) => {
                return Err(AccessError {
                    code: ErrorCode::IllegalListAccessorUsage,
                    message: format!("`.{}` needs a list, found `{other}`", field.as_str()),
                });
            }
        };
    }
    Ok(current)
}

/// One overload a call may bind to. `index` is its position in the overload
/// set of the table that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'t> {
    pub index: usize,
    pub overload: &'t Overload,
}

impl<'t> Candidate<'t> {
    /// Name of the overload in its defining module.
    pub fn original<'n>(&self, written: &'n str) -> &'n str
    where
        't: 'n,
    {
        let overload: &'t Overload = self.overload;
        match &overload.origin {
            OverloadOrigin::External { original, .. } => original,
            OverloadOrigin::Local { .. } => written,
        }
    }
}

pub fn candidates<'t>(
    table: &'t SymbolTable,
    externals: &'t ExternalTable,
    namespace: Namespace,
    name: &str,
) -> Vec<Candidate<'t>> {
    let local = table.overloads(namespace, name).iter().enumerate();
    let external = externals.overloads(namespace, name).iter().enumerate();
    local
        .chain(external)
        .map(|(index, overload)| Candidate { index, overload })
        .collect()
}
