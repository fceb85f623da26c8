//! Error types for the editor

use crate::entity::DeltaError;
use tei_parser::TagRange;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] tei_parser::ParseError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] tei_parser::SerializeError),

    #[error("Passage not found: {0}")]
    PassageNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Invalid range {range} for passage of length {len}")]
    InvalidRange { range: TagRange, len: usize },

    #[error("Range {range} crosses tag {tag_id}; tags must nest")]
    CrossingRange { range: TagRange, tag_id: String },

    #[error("Entity error: {0}")]
    Entity(#[from] DeltaError),

    #[error("Invalid revision {target}: must be between 0 and {current}")]
    InvalidRevision { target: u64, current: u64 },

    #[error("No revision after {from}: log ends at {latest}")]
    NoFutureRevision { from: u64, latest: u64 },

    #[error("Corrupt event log: {0}")]
    CorruptLog(String),
}
