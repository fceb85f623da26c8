//! # Mutations
//!
//! Requested edits to a TEI document, before they become events.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: each mutation is one annotation or cast edit
//! 2. **Validated**: preconditions are checked against the current state
//! 3. **Resolved once**: generated ids are fixed when the mutation becomes
//!    an event, so replaying the log never generates new ones
//!
//! ## Mutation Semantics
//!
//! ### AddSaidTag / AddTag
//! - Range must lie inside the passage text and be non-empty
//! - Range must nest with the passage's existing tags, never cross one
//! - Kind and attribute keys must be writable as XML; `xml:id` and
//!   `xmlns*` keys are reserved
//! - A `said` tag with a `who` attribute also yields a dialogue entry
//! - `who="#x"` is stored as `x`
//!
//! ### RemoveTag
//! - Searches every passage for the tag id
//! - Drops the matching dialogue entry with it
//!
//! ### RemoveCharacter
//! - Relationships that reference the character go with it
//!
//! ### AddRelationship
//! - Both ends must be known characters

use crate::tags::{find_passage, find_tag, validate_markup, validate_nesting, validate_range};
use crate::{DeltaError, EditorError, Event};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tei_parser::{generate_entity_id, new_tag_id, xml_id_or};
use tei_parser::{Character, DocumentState, EntityType, Relationship, Tag, TagKind, TagRange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    /// Attribute a span of passage text to a speaker
    #[serde(rename_all = "camelCase")]
    AddSaidTag {
        passage_id: String,
        range: TagRange,
        speaker: String,
    },

    /// Add an annotation of any kind
    #[serde(rename_all = "camelCase")]
    AddTag {
        passage_id: String,
        range: TagRange,
        kind: TagKind,
        #[serde(default)]
        attributes: BTreeMap<String, String>,
    },

    #[serde(rename_all = "camelCase")]
    RemoveTag { tag_id: String },

    /// Add a character; `id` and `xmlId` are generated when omitted
    #[serde(rename_all = "camelCase")]
    AddCharacter {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        xml_id: Option<String>,
        name: String,
        #[serde(default)]
        sex: Option<String>,
        #[serde(default)]
        aliases: Vec<String>,
        #[serde(default)]
        description: Option<String>,
    },

    /// Replace a character record, matched by id
    UpdateCharacter { character: Character },

    #[serde(rename_all = "camelCase")]
    RemoveCharacter { character_id: String },

    #[serde(rename_all = "camelCase")]
    AddRelationship {
        #[serde(default)]
        id: Option<String>,
        from: String,
        to: String,
        kind: String,
        #[serde(default)]
        mutual: bool,
    },

    #[serde(rename_all = "camelCase")]
    RemoveRelationship { relationship_id: String },
}

impl Mutation {
    /// Mutation that adds `character` exactly as given
    pub fn add_character(character: Character) -> Self {
        Mutation::AddCharacter {
            id: Some(character.id),
            xml_id: Some(character.xml_id),
            name: character.name,
            sex: character.sex,
            aliases: character.aliases,
            description: character.description,
        }
    }

    /// Check the mutation's references against `state`
    ///
    /// Field-level checks (empty names, self-links) are left to the entity
    /// reducer, which runs when the resulting event is applied.
    pub fn validate(&self, state: &DocumentState) -> Result<(), EditorError> {
        match self {
            Mutation::AddSaidTag { passage_id, range, .. } => {
                let (_, passage) = find_passage(&state.passages, passage_id)
                    .ok_or_else(|| EditorError::PassageNotFound(passage_id.clone()))?;
                validate_range(passage, range)?;
                validate_nesting(passage, range)
            }

            Mutation::AddTag {
                passage_id,
                range,
                kind,
                attributes,
            } => {
                let (_, passage) = find_passage(&state.passages, passage_id)
                    .ok_or_else(|| EditorError::PassageNotFound(passage_id.clone()))?;
                validate_range(passage, range)?;
                validate_markup(kind, attributes)?;
                validate_nesting(passage, range)
            }

            Mutation::RemoveTag { tag_id } => find_tag(&state.passages, tag_id)
                .map(|_| ())
                .ok_or_else(|| EditorError::TagNotFound(tag_id.clone())),

            Mutation::AddCharacter { id: Some(id), .. } if state.character(id).is_some() => {
                Err(DeltaError::DuplicateId(id.clone()).into())
            }
            Mutation::AddCharacter { .. } => Ok(()),

            Mutation::UpdateCharacter { character } => require_character(state, &character.id),

            Mutation::RemoveCharacter { character_id } => require_character(state, character_id),

            Mutation::AddRelationship { from, to, .. } => {
                require_character(state, from)?;
                require_character(state, to)
            }

            Mutation::RemoveRelationship { relationship_id } => state
                .relationship(relationship_id)
                .map(|_| ())
                .ok_or_else(|| DeltaError::EntityNotFound(relationship_id.clone()).into()),
        }
    }

    /// Resolve into the event recorded at `revision`, generating ids
    pub fn into_event(self, state: &DocumentState, revision: u64) -> Result<Event, EditorError> {
        self.validate(state)?;

        let event = match self {
            Mutation::AddSaidTag {
                passage_id,
                range,
                speaker,
            } => {
                let speaker = strip_pointer(&speaker).to_string();
                Event::SaidTagAdded {
                    revision,
                    passage_id,
                    tag: crate::tags::said_tag(new_tag_id(), range, &speaker),
                    speaker,
                }
            }

            Mutation::AddTag {
                passage_id,
                range,
                kind,
                mut attributes,
            } => {
                if let Some(who) = attributes.get_mut("who") {
                    *who = strip_pointer(who).to_string();
                }
                Event::TagAdded {
                    revision,
                    passage_id,
                    tag: Tag {
                        id: new_tag_id(),
                        kind,
                        range,
                        attributes,
                    },
                }
            }

            Mutation::RemoveTag { tag_id } => {
                let (at, _) = find_tag(&state.passages, &tag_id).ok_or_else(|| EditorError::TagNotFound(tag_id.clone()))?;
                Event::TagRemoved {
                    revision,
                    passage_id: state.passages[at].id.clone(),
                    tag_id,
                }
            }

            Mutation::AddCharacter {
                id,
                xml_id,
                name,
                sex,
                aliases,
                description,
            } => {
                let id = id.unwrap_or_else(|| generate_entity_id(EntityType::Character));
                Event::CharacterAdded {
                    revision,
                    character: Character {
                        xml_id: xml_id.unwrap_or_else(|| xml_id_or(&name, || id.clone())),
                        id,
                        name,
                        sex,
                        aliases,
                        description,
                    },
                }
            }

            Mutation::UpdateCharacter { character } => Event::CharacterUpdated { revision, character },

            Mutation::RemoveCharacter { character_id } => Event::CharacterRemoved { revision, character_id },

            Mutation::AddRelationship {
                id,
                from,
                to,
                kind,
                mutual,
            } => Event::RelationshipAdded {
                revision,
                relationship: Relationship {
                    id: id.unwrap_or_else(|| generate_entity_id(EntityType::Relationship)),
                    from,
                    to,
                    kind,
                    mutual,
                },
            },

            Mutation::RemoveRelationship { relationship_id } => Event::RelationshipRemoved {
                revision,
                relationship_id,
            },
        };

        Ok(event)
    }
}

fn require_character(state: &DocumentState, id: &str) -> Result<(), EditorError> {
    match state.character(id) {
        Some(_) => Ok(()),
        None => Err(DeltaError::EntityNotFound(id.to_string()).into()),
    }
}

fn strip_pointer(value: &str) -> &str {
    value.strip_prefix('#').unwrap_or(value)
}

/// Read a JSON array of mutations
pub fn mutations_from_json(json: &str) -> Result<Vec<Mutation>, serde_json::Error> {
    serde_json::from_str(json)
}
