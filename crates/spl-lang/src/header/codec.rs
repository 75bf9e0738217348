//! Wire grammar for type expressions inside header documents:
//!
//! ```text
//! BASICTYPE(type_id="Int")
//! TUPLETYPE(type1=T, type2=T)
//! LISTTYPE(type=T)
//! TYPESYN(type_id="Name")
//! FUNTYPE(type_params=[T, ...], return_type=T)
//! ```

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::{all_consuming, map, map_opt};
use nom::multi::separated_list0;
use nom::sequence::{delimited, pair, preceded, separated_pair, tuple};
use nom::IResult;

use crate::syntax::ast::{BasicType, FnType, Type};
use super::HeaderError;

// ─── Decoding ─────────────────────────────────────────────────────────────────

pub fn decode_type(text: &str) -> Result<Type, HeaderError> {
    all_consuming(wire_type)(text)
        .map(|(_, ty)| ty)
        .map_err(|e| HeaderError::TypeFormat { text: text.to_string(), reason: e.to_string() })
}

pub fn decode_fn_type(text: &str) -> Result<FnType, HeaderError> {
    all_consuming(ws(fun_type))(text)
        .map(|(_, ty)| ty)
        .map_err(|e| HeaderError::TypeFormat { text: text.to_string(), reason: e.to_string() })
}

fn ws<'a, O>(inner: impl FnMut(&'a str) -> IResult<&'a str, O>) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

/// `KEYWORD(` ... `)`
fn constructor<'a, O>(
    keyword: &'static str,
    body: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(pair(tag(keyword), ws(char('('))), body, ws(char(')')))
}

/// `key=value`
fn field<'a, O>(
    key: &'static str,
    value: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    preceded(tuple((ws(tag(key)), char('='), multispace0)), value)
}

fn quoted_name(i: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'), char('"'))(i)
}

fn wire_type(i: &str) -> IResult<&str, Type> {
    ws(alt((basic_type, tuple_type, list_type, syn_type)))(i)
}

fn basic_type(i: &str) -> IResult<&str, Type> {
    map_opt(constructor("BASICTYPE", field("type_id", quoted_name)), |name| {
        BasicType::from_name(name).map(Type::Basic)
    })(i)
}

fn tuple_type(i: &str) -> IResult<&str, Type> {
    map(
        constructor(
            "TUPLETYPE",
            separated_pair(field("type1", wire_type), char(','), field("type2", wire_type)),
        ),
        |(a, b)| Type::tuple(a, b),
    )(i)
}

fn list_type(i: &str) -> IResult<&str, Type> {
    map(constructor("LISTTYPE", field("type", wire_type)), Type::list)(i)
}

fn syn_type(i: &str) -> IResult<&str, Type> {
    map(constructor("TYPESYN", field("type_id", quoted_name)), |name: &str| Type::Syn(name.to_string()))(i)
}

fn fun_type(i: &str) -> IResult<&str, FnType> {
    let params = delimited(ws(char('[')), separated_list0(char(','), wire_type), ws(char(']')));
    map(
        constructor(
            "FUNTYPE",
            separated_pair(field("type_params", params), char(','), field("return_type", wire_type)),
        ),
        |(params, ret)| FnType::new(params, ret),
    )(i)
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

pub fn encode_type(ty: &Type) -> String {
    match ty {
        Type::Basic(b)    => format!("BASICTYPE(type_id=\"{}\")", b.as_str()),
        Type::Tuple(a, b) => format!("TUPLETYPE(type1={}, type2={})", encode_type(a), encode_type(b)),
        Type::List(e)     => format!("LISTTYPE(type={})", encode_type(e)),
        Type::Syn(name)   => format!("TYPESYN(type_id=\"{name}\")"),
    }
}

pub fn encode_fn_type(ty: &FnType) -> String {
    let params: Vec<String> = ty.params.iter().map(encode_type).collect();
    format!("FUNTYPE(type_params=[{}], return_type={})", params.join(", "), encode_type(&ty.ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_type() {
        let text = r#"TUPLETYPE(type1=BASICTYPE(type_id="Int"), type2=LISTTYPE(type=TYPESYN(type_id="Point")))"#;
        assert_eq!(
            decode_type(text).unwrap(),
            Type::tuple(Type::INT, Type::list(Type::Syn("Point".into())))
        );
    }

    #[test]
    fn tolerates_whitespace() {
        let text = " LISTTYPE( type = BASICTYPE( type_id = \"Char\" ) ) ";
        assert_eq!(decode_type(text).unwrap(), Type::list(Type::CHAR));
    }

    #[test]
    fn decodes_function_type() {
        let text = r#"FUNTYPE(type_params=[BASICTYPE(type_id="Int"), BASICTYPE(type_id="Bool")], return_type=BASICTYPE(type_id="Void"))"#;
        assert_eq!(decode_fn_type(text).unwrap(), FnType::new(vec![Type::INT, Type::BOOL], Type::VOID));
        let nullary = r#"FUNTYPE(type_params=[], return_type=BASICTYPE(type_id="Char"))"#;
        assert_eq!(decode_fn_type(nullary).unwrap(), FnType::new(vec![], Type::CHAR));
    }

    #[test]
    fn encoded_form_decodes_back() {
        let ty = FnType::new(vec![Type::tuple(Type::CHAR, Type::Syn("P".into()))], Type::list(Type::BOOL));
        assert_eq!(decode_fn_type(&encode_fn_type(&ty)).unwrap(), ty);
    }

    #[test]
    fn rejects_unknown_basic_type() {
        assert!(matches!(decode_type(r#"BASICTYPE(type_id="Float")"#), Err(HeaderError::TypeFormat { .. })));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(decode_type(r#"BASICTYPE(type_id="Int") x"#).is_err());
    }
}
