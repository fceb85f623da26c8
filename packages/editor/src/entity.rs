//! # Entity Delta Protocol
//!
//! Generic create/update/delete reducer over a flat entity collection.
//!
//! | Delta  | Precondition                             | Failure                          |
//! |--------|------------------------------------------|----------------------------------|
//! | create | id not present, declared type matches    | `DuplicateId` / `TypeMismatch`   |
//! | update | id present, stored type == declared type | `EntityNotFound` / `TypeMismatch`|
//! | delete | id present                               | `EntityNotFound`                 |
//!
//! The input collection is borrowed and never modified; on failure the
//! caller still holds the exact collection it passed in.

use serde::{Deserialize, Serialize};
use tei_parser::{Character, Entity, EntityType, Organization, Place, Relationship, SharedList};
use thiserror::Error;

pub use tei_parser::{generate_entity_id, generate_xml_id, xml_id_or};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeltaError {
    #[error("Entity id already present: {0}")]
    DuplicateId(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Entity {id} is a {found}, not a {expected}")]
    TypeMismatch {
        id: String,
        expected: EntityType,
        found: EntityType,
    },

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A record the delta reducer can manage
pub trait EntityRecord: Clone {
    fn id(&self) -> &str;

    fn entity_type(&self) -> EntityType;

    /// Field-level validation (non-empty ids, type-specific requirements)
    fn validate(&self) -> Result<(), DeltaError>;
}

/// Requested change against an entity collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EntityDelta<T> {
    #[serde(rename_all = "camelCase")]
    Create { entity_type: EntityType, entity: T },
    #[serde(rename_all = "camelCase")]
    Update { entity_type: EntityType, entity: T },
    Delete { id: String },
}

pub fn create_delta<T>(entity_type: EntityType, entity: T) -> EntityDelta<T> {
    EntityDelta::Create { entity_type, entity }
}

pub fn update_delta<T>(entity_type: EntityType, entity: T) -> EntityDelta<T> {
    EntityDelta::Update { entity_type, entity }
}

pub fn delete_delta<T>(id: impl Into<String>) -> EntityDelta<T> {
    EntityDelta::Delete { id: id.into() }
}

/// Apply one delta, returning the new collection
pub fn apply_delta<T: EntityRecord>(collection: &SharedList<T>, delta: EntityDelta<T>) -> Result<SharedList<T>, DeltaError> {
    match delta {
        EntityDelta::Create { entity_type, entity } => {
            if collection.position(|e| e.id() == entity.id()).is_some() {
                return Err(DeltaError::DuplicateId(entity.id().to_string()));
            }
            check_declared_type(&entity, entity_type)?;
            entity.validate()?;
            Ok(collection.with_pushed(entity))
        }

        EntityDelta::Update { entity_type, entity } => {
            let index = collection
                .position(|e| e.id() == entity.id())
                .ok_or_else(|| DeltaError::EntityNotFound(entity.id().to_string()))?;
            check_declared_type(&collection[index], entity_type)?;
            check_declared_type(&entity, entity_type)?;
            entity.validate()?;
            Ok(collection.with_replaced(index, entity))
        }

        EntityDelta::Delete { id } => {
            let index = collection
                .position(|e| e.id() == id)
                .ok_or(DeltaError::EntityNotFound(id))?;
            Ok(collection.with_removed(index))
        }
    }
}

fn check_declared_type<T: EntityRecord>(entity: &T, declared: EntityType) -> Result<(), DeltaError> {
    let found = entity.entity_type();
    if found != declared {
        return Err(DeltaError::TypeMismatch {
            id: entity.id().to_string(),
            expected: declared,
            found,
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), DeltaError> {
    if value.trim().is_empty() {
        return Err(DeltaError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Common-shape validation shared by every entity kind
pub fn validate_entity(entity: &Entity) -> Result<(), DeltaError> {
    require("id", entity.id())?;
    require("xmlId", entity.xml_id())?;
    require("name", entity.name())?;

    if let Entity::Place(place) = entity {
        if place.coordinates.is_none() {
            return Err(DeltaError::InvalidField {
                field: "coordinates",
                reason: "required for a place".to_string(),
            });
        }
    }

    Ok(())
}

impl EntityRecord for Entity {
    fn id(&self) -> &str {
        Entity::id(self)
    }

    fn entity_type(&self) -> EntityType {
        Entity::entity_type(self)
    }

    fn validate(&self) -> Result<(), DeltaError> {
        validate_entity(self)
    }
}

impl EntityRecord for Character {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Character
    }

    fn validate(&self) -> Result<(), DeltaError> {
        require("id", &self.id)?;
        require("xmlId", &self.xml_id)?;
        require("name", &self.name)
    }
}

impl EntityRecord for Place {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Place
    }

    fn validate(&self) -> Result<(), DeltaError> {
        validate_entity(&Entity::Place(self.clone()))
    }
}

impl EntityRecord for Organization {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Organization
    }

    fn validate(&self) -> Result<(), DeltaError> {
        require("id", &self.id)?;
        require("xmlId", &self.xml_id)?;
        require("name", &self.name)
    }
}

impl EntityRecord for Relationship {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Relationship
    }

    fn validate(&self) -> Result<(), DeltaError> {
        require("id", &self.id)?;
        require("from", &self.from)?;
        require("to", &self.to)?;
        require("kind", &self.kind)?;
        if self.from == self.to {
            return Err(DeltaError::InvalidField {
                field: "to",
                reason: "a relationship needs two distinct characters".to_string(),
            });
        }
        Ok(())
    }
}

/// Character with a generated id and an xml id derived from `name`
pub fn new_character(name: &str) -> Character {
    let id = generate_entity_id(EntityType::Character);
    Character {
        xml_id: xml_id_or(name, || id.clone()),
        id,
        name: name.to_string(),
        sex: None,
        aliases: Vec::new(),
        description: None,
    }
}
