//! # Events
//!
//! Immutable facts appended to a document's revision log.
//!
//! The event at index `n` of a log always carries `revision == n`. The first
//! event is `loaded` and holds the full initial state, so the log alone is
//! enough to rebuild every revision.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tei_parser::{Character, DocumentState, Relationship, Tag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Document loaded from markup; `snapshot` is revision 0
    Loaded {
        revision: u64,
        snapshot: Arc<DocumentState>,
    },

    #[serde(rename_all = "camelCase")]
    SaidTagAdded {
        revision: u64,
        passage_id: String,
        tag: Tag,
        speaker: String,
    },

    #[serde(rename_all = "camelCase")]
    TagAdded {
        revision: u64,
        passage_id: String,
        tag: Tag,
    },

    #[serde(rename_all = "camelCase")]
    TagRemoved {
        revision: u64,
        passage_id: String,
        tag_id: String,
    },

    CharacterAdded {
        revision: u64,
        character: Character,
    },

    CharacterUpdated {
        revision: u64,
        character: Character,
    },

    /// Also drops every relationship that references the character
    #[serde(rename_all = "camelCase")]
    CharacterRemoved {
        revision: u64,
        character_id: String,
    },

    RelationshipAdded {
        revision: u64,
        relationship: Relationship,
    },

    #[serde(rename_all = "camelCase")]
    RelationshipRemoved {
        revision: u64,
        relationship_id: String,
    },
}

impl Event {
    pub fn revision(&self) -> u64 {
        match self {
            Event::Loaded { revision, .. }
            | Event::SaidTagAdded { revision, .. }
            | Event::TagAdded { revision, .. }
            | Event::TagRemoved { revision, .. }
            | Event::CharacterAdded { revision, .. }
            | Event::CharacterUpdated { revision, .. }
            | Event::CharacterRemoved { revision, .. }
            | Event::RelationshipAdded { revision, .. }
            | Event::RelationshipRemoved { revision, .. } => *revision,
        }
    }

    /// Wire name of the variant, as written in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Loaded { .. } => "loaded",
            Event::SaidTagAdded { .. } => "saidTagAdded",
            Event::TagAdded { .. } => "tagAdded",
            Event::TagRemoved { .. } => "tagRemoved",
            Event::CharacterAdded { .. } => "characterAdded",
            Event::CharacterUpdated { .. } => "characterUpdated",
            Event::CharacterRemoved { .. } => "characterRemoved",
            Event::RelationshipAdded { .. } => "relationshipAdded",
            Event::RelationshipRemoved { .. } => "relationshipRemoved",
        }
    }

    /// Passage the event touches, for tag events
    pub fn passage_id(&self) -> Option<&str> {
        match self {
            Event::SaidTagAdded { passage_id, .. }
            | Event::TagAdded { passage_id, .. }
            | Event::TagRemoved { passage_id, .. } => Some(passage_id),
            _ => None,
        }
    }
}
