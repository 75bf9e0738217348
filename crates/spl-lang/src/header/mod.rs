//! Header documents: the exported interface of a compiled module.
//!
//! A header is JSON with type expressions embedded as strings in the wire
//! grammar of [`codec`]. Parsing only checks shape; synonym expansion is left
//! to the import merger.

pub mod codec;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::symbols::{OverloadOrigin, SymbolTable, VarInfo};
use crate::syntax::ast::{Assoc, Fixity, FnType, Namespace, Type};

/// Raw header text per module name.
pub type Headers = IndexMap<String, String>;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("cannot read header `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed header document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed type expression `{text}`: {reason}")]
    TypeFormat { text: String, reason: String },
    #[error("invalid entry `{name}`: {reason}")]
    Entry { name: String, reason: String },
}

// ─── Document ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderDocument {
    pub module: String,
    #[serde(default)]
    pub globals: Vec<NamedType>,
    #[serde(default)]
    pub type_syns: Vec<NamedType>,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub namespace: Namespace,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assoc: Option<Assoc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub constant: bool,
    /// `FUNTYPE(...)` in the wire grammar.
    #[serde(rename = "type")]
    pub ty: String,
}

// ─── Decoded form ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub module: String,
    pub globals: Vec<(String, Type)>,
    pub type_syns: Vec<(String, Type)>,
    pub functions: Vec<HeaderFunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFunction {
    pub namespace: Namespace,
    pub name: String,
    pub fixity: Option<Fixity>,
    pub ty: FnType,
    pub constant: bool,
}

impl Header {
    pub fn parse(text: &str) -> Result<Self, HeaderError> {
        let doc: HeaderDocument = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: HeaderDocument) -> Result<Self, HeaderError> {
        let decode_named = |entries: Vec<NamedType>| -> Result<Vec<(String, Type)>, HeaderError> {
            entries
                .into_iter()
                .map(|e| -> Result<(String, Type), HeaderError> { Ok((e.name, codec::decode_type(&e.ty)?)) })
                .collect()
        };
        let globals = decode_named(doc.globals)?;
        let type_syns = decode_named(doc.type_syns)?;
        let functions = doc.functions.into_iter().map(decode_function).collect::<Result<_, _>>()?;
        Ok(Self { module: doc.module, globals, type_syns, functions })
    }
}

fn decode_function(entry: FunctionEntry) -> Result<HeaderFunction, HeaderError> {
    let invalid = |reason: &str| HeaderError::Entry { name: entry.name.clone(), reason: reason.to_string() };

    let fixity = match (entry.namespace, entry.fixity, entry.assoc) {
        (Namespace::Infix, Some(precedence), Some(assoc)) => Some(Fixity::new(assoc, precedence)),
        (Namespace::Infix, _, _) => return Err(invalid("infix operator needs both fixity and assoc")),
        (_, None, None) => None,
        _ => return Err(invalid("only infix operators carry fixity")),
    };
    let arity = match entry.namespace {
        Namespace::Function => None,
        Namespace::Prefix => Some(1),
        Namespace::Infix => Some(2),
    };
    let ty = codec::decode_fn_type(&entry.ty)?;
    if arity.is_some_and(|n| n != ty.params.len()) {
        return Err(invalid("operator has the wrong number of parameters"));
    }

    Ok(HeaderFunction {
        namespace: entry.namespace,
        fixity,
        ty,
        constant: entry.constant,
        name: entry.name,
    })
}

// ─── Emission ─────────────────────────────────────────────────────────────────

/// Serializes the interface of a resolved module: every global, synonym and
/// locally defined overload, in declaration order.
pub fn emit(table: &SymbolTable) -> Result<String, HeaderError> {
    let named = |(name, info): (&String, &VarInfo)| NamedType {
        name: name.clone(),
        ty: codec::encode_type(&info.ty),
    };
    let mut doc = HeaderDocument {
        module: table.module.clone(),
        globals: table.globals.iter().map(named).collect(),
        type_syns: table.type_syns.iter().map(named).collect(),
        functions: Vec::new(),
    };
    for ((namespace, name), overloads) in &table.functions {
        for overload in overloads {
            let OverloadOrigin::Local { fixity, .. } = &overload.origin else { continue };
            doc.functions.push(FunctionEntry {
                namespace: *namespace,
                name: name.clone(),
                fixity: fixity.map(|f| f.precedence),
                assoc: fixity.map(|f| f.assoc),
                constant: false,
                ty: codec::encode_fn_type(&overload.ty),
            });
        }
    }
    Ok(serde_json::to_string_pretty(&doc)?)
}

// ─── Loading ──────────────────────────────────────────────────────────────────

/// Reads `<dir>/<module>.<extension>` for each module from the first directory
/// that has it. Modules with no header anywhere are left out of the map.
pub fn load<'m>(
    modules: impl IntoIterator<Item = &'m str>,
    dirs: &[PathBuf],
    extension: &str,
) -> Result<Headers, HeaderError> {
    let mut headers = Headers::new();
    for module in modules {
        if headers.contains_key(module) {
            continue;
        }
        for dir in dirs {
            if let Some(text) = read_optional(&dir.join(format!("{module}.{extension}")))? {
                headers.insert(module.to_string(), text);
                break;
            }
        }
        if !headers.contains_key(module) {
            debug!(module, "no header found");
        }
    }
    Ok(headers)
}

fn read_optional(path: &Path) -> Result<Option<String>, HeaderError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), bytes = text.len(), "loaded header");
            Ok(Some(text))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(HeaderError::Io { path: path.to_path_buf(), source }),
    }
}
