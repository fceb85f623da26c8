//! # Document Handle
//!
//! Immutable TEI document value: the materialized state plus the event log
//! that produced it.
//!
//! Every operation borrows a `Document` and returns a new one. The input is
//! never changed, so older values stay valid and can be queried or edited
//! independently.
//!
//! ## Lifecycle
//!
//! ```text
//! load ──▶ rev 0 ──edit──▶ rev 1 ──edit──▶ rev 2
//!                    ◀──undo_to──   ──redo_from──▶
//! ```
//!
//! Undo and redo move the state cursor and leave `events` alone. Editing a
//! document whose cursor is behind the end of the log truncates the log at
//! the cursor before appending.

use crate::history::{apply_event, replay};
use crate::{EditorError, Event, Mutation};
use std::collections::BTreeMap;
use std::sync::Arc;
use tei_parser::{Character, DocumentState, SerializeError, SerializeOptions, Serializer, SharedList, TagKind, TagRange};
use tracing::{debug, info, instrument};

/// Editable TEI document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// State at the current revision
    pub state: Arc<DocumentState>,

    /// Full revision log; `events[n].revision() == n`
    pub events: SharedList<Event>,
}

impl Document {
    /// Parse TEI markup into a document at revision 0
    #[instrument(skip_all, fields(bytes = xml.len()))]
    pub fn load(xml: &str) -> Result<Self, EditorError> {
        let state = Arc::new(tei_parser::parse(xml)?);

        info!(
            passages = state.passages.len(),
            characters = state.characters.len(),
            tags = state.tag_count(),
            "document loaded"
        );

        let loaded = Event::Loaded {
            revision: 0,
            snapshot: state.clone(),
        };

        Ok(Self {
            state,
            events: SharedList::from_vec(vec![loaded]),
        })
    }

    /// Rebuild a document from a stored event log, positioned at its last revision
    pub fn from_events(events: SharedList<Event>) -> Result<Self, EditorError> {
        let state = replay(events.iter())?;
        Ok(Self {
            state: Arc::new(state),
            events,
        })
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    /// Revision of the newest event in the log
    pub fn latest_revision(&self) -> u64 {
        crate::history::latest_revision(&self.events).unwrap_or(0)
    }

    pub fn can_undo(&self) -> bool {
        self.state.revision > 0
    }

    pub fn can_redo(&self) -> bool {
        self.state.revision < self.latest_revision()
    }

    /// Apply a mutation, producing the next revision
    #[instrument(skip(self), fields(revision = self.state.revision))]
    pub fn apply(&self, mutation: Mutation) -> Result<Self, EditorError> {
        let revision = self.state.revision + 1;
        let event = mutation.into_event(&self.state, revision)?;
        let state = apply_event(&self.state, &event)?;

        let mut events = self.events.clone();
        if self.can_redo() {
            debug!(
                dropped = self.latest_revision() - self.state.revision,
                "discarding undone revisions"
            );
            events = events.truncated(revision as usize);
        }

        debug!(kind = event.kind(), revision, "event appended");

        Ok(Self {
            state: Arc::new(state),
            events: events.with_pushed(event),
        })
    }

    /// Attribute `range` of a passage to `speaker_id` with a `said` tag
    pub fn add_said_tag(&self, passage_id: &str, range: TagRange, speaker_id: &str) -> Result<Self, EditorError> {
        self.apply(Mutation::AddSaidTag {
            passage_id: passage_id.to_string(),
            range,
            speaker: speaker_id.to_string(),
        })
    }

    pub fn add_tag(
        &self,
        passage_id: &str,
        range: TagRange,
        kind: TagKind,
        attributes: BTreeMap<String, String>,
    ) -> Result<Self, EditorError> {
        self.apply(Mutation::AddTag {
            passage_id: passage_id.to_string(),
            range,
            kind,
            attributes,
        })
    }

    /// Remove a tag, wherever it lives, along with its dialogue entry
    pub fn remove_tag(&self, tag_id: &str) -> Result<Self, EditorError> {
        self.apply(Mutation::RemoveTag {
            tag_id: tag_id.to_string(),
        })
    }

    pub fn add_character(&self, character: Character) -> Result<Self, EditorError> {
        self.apply(Mutation::add_character(character))
    }

    pub fn update_character(&self, character: Character) -> Result<Self, EditorError> {
        self.apply(Mutation::UpdateCharacter { character })
    }

    pub fn remove_character(&self, character_id: &str) -> Result<Self, EditorError> {
        self.apply(Mutation::RemoveCharacter {
            character_id: character_id.to_string(),
        })
    }

    pub fn add_relationship(&self, from: &str, to: &str, kind: &str, mutual: bool) -> Result<Self, EditorError> {
        self.apply(Mutation::AddRelationship {
            id: None,
            from: from.to_string(),
            to: to.to_string(),
            kind: kind.to_string(),
            mutual,
        })
    }

    pub fn remove_relationship(&self, relationship_id: &str) -> Result<Self, EditorError> {
        self.apply(Mutation::RemoveRelationship {
            relationship_id: relationship_id.to_string(),
        })
    }

    /// Move back to `target` by replaying `events[0..=target]`
    #[instrument(skip(self), fields(revision = self.state.revision))]
    pub fn undo_to(&self, target: u64) -> Result<Self, EditorError> {
        if target > self.state.revision {
            return Err(EditorError::InvalidRevision {
                target,
                current: self.state.revision,
            });
        }
        self.at_revision(target)
    }

    /// Move forward one revision from `from` by replaying `events[0..=from + 1]`
    #[instrument(skip(self), fields(revision = self.state.revision))]
    pub fn redo_from(&self, from: u64) -> Result<Self, EditorError> {
        let latest = self.latest_revision();
        if from >= latest {
            return Err(EditorError::NoFutureRevision { from, latest });
        }
        self.at_revision(from + 1)
    }

    fn at_revision(&self, revision: u64) -> Result<Self, EditorError> {
        let state = replay(self.events.iter().take(revision as usize + 1))?;
        debug!(revision, events = self.events.len(), "replayed");

        Ok(Self {
            state: Arc::new(state),
            events: self.events.clone(),
        })
    }

    /// Current state as TEI markup
    pub fn serialize(&self) -> Result<String, SerializeError> {
        tei_parser::serialize(&self.state)
    }

    pub fn serialize_with(&self, options: SerializeOptions) -> Result<String, SerializeError> {
        Serializer::with_options(options).serialize(&self.state)
    }
}
