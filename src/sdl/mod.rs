//! SDL collaborator
//!
//! Thin layer over `async-graphql-parser` providing what schema assembly
//! needs: document validation, structural merge of several documents and a
//! printer for the merged result.

mod merge;
mod print;
mod validate;

pub use merge::merge_type_defs;
pub use print::print_document;
pub use validate::validate_sdl;

use async_graphql_parser::types::{BaseType, ServiceDocument, Type};

/// Parse one SDL document, flattening the parser error into a message
pub fn parse(source: &str) -> Result<ServiceDocument, String> {
    async_graphql_parser::parse_schema(source).map_err(|e| e.to_string())
}

/// Innermost named type of a possibly wrapped type reference
pub(crate) fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}
