//! # TEI Editor
//!
//! Immutable, event-sourced editing engine for TEI documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ tei-parser: TEI XML ⇄ DocumentState         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tei-editor: Document { state, events }      │
//! │  - Mutations resolved into events           │
//! │  - Tag range operations                     │
//! │  - Entity delta protocol                    │
//! │  - Replay-based undo/redo                   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ callers: CLI, UI, validation layers         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The log is the source of truth**: every state is a replay of a prefix
//! 2. **Values, not handles**: operations return new documents and leave
//!    their input untouched
//! 3. **Structural sharing**: untouched passages, tags and entities are the
//!    same allocations across revisions
//! 4. **Stable ids**: passage ids are fixed at load and never recomputed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tei_editor::{Document, TagRange};
//!
//! let doc = Document::load(&xml)?;
//! let passage = doc.state.passages[0].id.clone();
//! let speaker = doc.state.characters[0].id.clone();
//!
//! let tagged = doc.add_said_tag(&passage, TagRange::new(0, 10), &speaker)?;
//! assert_eq!(tagged.state.dialogue.len(), 1);
//!
//! // `doc` is still revision 0
//! let back = tagged.undo_to(0)?;
//! assert_eq!(back.state, doc.state);
//!
//! std::fs::write("out.xml", tagged.serialize()?)?;
//! ```

mod document;
mod errors;
mod events;
mod mutations;

pub mod entity;
pub mod history;
pub mod tags;

pub use document::Document;
pub use entity::{apply_delta, create_delta, delete_delta, update_delta, validate_entity, DeltaError, EntityDelta, EntityRecord};
pub use errors::EditorError;
pub use events::Event;
pub use history::replay;
pub use mutations::{mutations_from_json, Mutation};

pub use tei_parser::{
    Character, DialogueEntry, DocumentState, Entity, EntityType, Passage, Relationship, SerializeOptions, SharedList, Tag,
    TagKind, TagRange,
};
