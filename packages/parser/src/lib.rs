//! # TEI Parser
//!
//! Document model plus the TEI XML reader and writer.
//!
//! ```text
//! TEI XML ──parse──▶ DocumentState (revision 0) ──serialize──▶ TEI XML
//! ```
//!
//! The reader is the only place passage ids are computed; every later
//! revision carries them forward unchanged.

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod parser;
pub mod serializer;
pub mod shared;

#[cfg(test)]
mod tests_serializer;

pub use ast::*;
pub use error::{MarkupError, ParseError, ParseResult, SerializeError};
#[cfg(feature = "pretty-errors")]
pub use error::format_parse_error;
pub use id_generator::{generate_entity_id, generate_xml_id, get_passage_id, new_tag_id, xml_id_or};
pub use parser::{parse, Parser};
pub use serializer::{serialize, SerializeOptions, Serializer};
pub use shared::SharedList;
