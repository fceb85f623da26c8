//! # Revision History
//!
//! Forward reducer and replay over a document's event log.
//!
//! ## Design
//!
//! - The log is linear: revision `n` is the fold of `events[0..=n]`
//! - Undo and redo never edit the log, they replay a prefix of it
//! - A new edit on an undone document drops the abandoned future first
//! - The reducer re-checks every precondition, so a hand-written or
//!   deserialized log that does not describe a valid history is rejected

use crate::entity::{apply_delta, create_delta, delete_delta, update_delta, DeltaError};
use crate::tags::{dialogue_for, find_passage, insert_tag, remove_tag, validate_markup, validate_nesting, validate_range};
use crate::{EditorError, Event};
use tei_parser::{DocumentState, EntityType, Passage, SharedList, Tag};
use tracing::debug;

/// Fold `events` into the state they describe
///
/// The first event must be `loaded` and every event's revision must equal
/// its position in the log.
pub fn replay<'a, I>(events: I) -> Result<DocumentState, EditorError>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut events = events.into_iter();

    let mut state = match events.next() {
        Some(Event::Loaded { revision: 0, snapshot }) => DocumentState {
            revision: 0,
            ..(**snapshot).clone()
        },
        Some(other) => {
            return Err(EditorError::CorruptLog(format!(
                "log starts with `{}` at revision {}, expected `loaded` at revision 0",
                other.kind(),
                other.revision()
            )))
        }
        None => return Err(EditorError::CorruptLog("empty event log".to_string())),
    };

    for (index, event) in events.enumerate() {
        let expected = index as u64 + 1;
        if event.revision() != expected {
            return Err(EditorError::CorruptLog(format!(
                "event `{}` carries revision {} at position {}",
                event.kind(),
                event.revision(),
                expected
            )));
        }
        state = apply_event(&state, event)?;
    }

    Ok(state)
}

/// Apply one event on top of `state`, producing the next revision
pub fn apply_event(state: &DocumentState, event: &Event) -> Result<DocumentState, EditorError> {
    debug!(revision = event.revision(), kind = event.kind(), "applying event");

    let next = match event {
        Event::Loaded { revision, .. } => {
            return Err(EditorError::CorruptLog(format!(
                "`loaded` may only start the log, found at revision {}",
                revision
            )))
        }

        Event::SaidTagAdded { passage_id, tag, .. } | Event::TagAdded { passage_id, tag, .. } => {
            add_tag(state, passage_id, tag)?
        }

        Event::TagRemoved { passage_id, tag_id, .. } => {
            let (at, passage) =
                find_passage(&state.passages, passage_id).ok_or_else(|| EditorError::PassageNotFound(passage_id.clone()))?;
            let (passage, _) = remove_tag(passage, tag_id).ok_or_else(|| EditorError::TagNotFound(tag_id.clone()))?;

            DocumentState {
                passages: state.passages.with_replaced(at, passage),
                dialogue: state.dialogue.retain(|entry| entry.tag_id != *tag_id),
                ..state.clone()
            }
        }

        Event::CharacterAdded { character, .. } => DocumentState {
            characters: apply_delta(&state.characters, create_delta(EntityType::Character, character.clone()))?,
            ..state.clone()
        },

        Event::CharacterUpdated { character, .. } => DocumentState {
            characters: apply_delta(&state.characters, update_delta(EntityType::Character, character.clone()))?,
            ..state.clone()
        },

        Event::CharacterRemoved { character_id, .. } => DocumentState {
            characters: apply_delta(&state.characters, delete_delta(character_id.as_str()))?,
            relationships: state.relationships.retain(|r| !r.involves(character_id)),
            ..state.clone()
        },

        Event::RelationshipAdded { relationship, .. } => {
            for end in [&relationship.from, &relationship.to] {
                if state.character(end).is_none() {
                    return Err(DeltaError::EntityNotFound(end.clone()).into());
                }
            }
            DocumentState {
                relationships: apply_delta(
                    &state.relationships,
                    create_delta(EntityType::Relationship, relationship.clone()),
                )?,
                ..state.clone()
            }
        }

        Event::RelationshipRemoved { relationship_id, .. } => DocumentState {
            relationships: apply_delta(&state.relationships, delete_delta(relationship_id.as_str()))?,
            ..state.clone()
        },
    };

    Ok(DocumentState {
        revision: event.revision(),
        ..next
    })
}

fn add_tag(state: &DocumentState, passage_id: &str, tag: &Tag) -> Result<DocumentState, EditorError> {
    let (at, passage) =
        find_passage(&state.passages, passage_id).ok_or_else(|| EditorError::PassageNotFound(passage_id.to_string()))?;
    validate_range(passage, &tag.range)?;
    validate_markup(&tag.kind, &tag.attributes)?;
    if passage.tag(&tag.id).is_some() {
        return Err(DeltaError::DuplicateId(tag.id.clone()).into());
    }
    validate_nesting(passage, &tag.range)?;

    let passage: Passage = insert_tag(passage, tag.clone());
    let dialogue = match dialogue_for(&passage, tag) {
        Some(entry) => state.dialogue.with_pushed(entry),
        None => state.dialogue.clone(),
    };

    Ok(DocumentState {
        passages: state.passages.with_replaced(at, passage),
        dialogue,
        ..state.clone()
    })
}

/// Revision of the last event in `events`, or `None` for an empty log
pub fn latest_revision(events: &SharedList<Event>) -> Option<u64> {
    events.len().checked_sub(1).map(|last| last as u64)
}
