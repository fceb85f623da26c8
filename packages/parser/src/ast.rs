use crate::error::MarkupError;
use crate::parser::PASSAGE_ELEMENTS;
use crate::shared::SharedList;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Title and author from the TEI header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub author: String,
}

/// Half-open char range `[start, end)` inside a passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRange {
    pub start: usize,
    pub end: usize,
}

impl TagRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains(&self, other: &TagRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the ranges share at least one char
    pub fn overlaps(&self, other: &TagRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True when the ranges overlap but neither contains the other
    pub fn crosses(&self, other: &TagRange) -> bool {
        self.overlaps(other) && !self.contains(other) && !other.contains(self)
    }
}

impl fmt::Display for TagRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Annotation element kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagKind {
    Said,
    Q,
    PersName,
    PlaceName,
    OrgName,
    Other(String),
}

impl TagKind {
    pub fn from_element(name: &str) -> Self {
        match name {
            "said" => TagKind::Said,
            "q" => TagKind::Q,
            "persName" => TagKind::PersName,
            "placeName" => TagKind::PlaceName,
            "orgName" => TagKind::OrgName,
            other => TagKind::Other(other.to_string()),
        }
    }

    /// Element name used when writing the tag back to markup
    pub fn element_name(&self) -> &str {
        match self {
            TagKind::Said => "said",
            TagKind::Q => "q",
            TagKind::PersName => "persName",
            TagKind::PlaceName => "placeName",
            TagKind::OrgName => "orgName",
            TagKind::Other(name) => name,
        }
    }
}

impl From<String> for TagKind {
    fn from(name: String) -> Self {
        TagKind::from_element(&name)
    }
}

impl From<TagKind> for String {
    fn from(kind: TagKind) -> Self {
        kind.element_name().to_string()
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Range-scoped annotation inside a passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub kind: TagKind,
    pub range: TagRange,
    pub attributes: BTreeMap<String, String>,
}

impl Tag {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Speaker id of a `said` tag
    pub fn speaker(&self) -> Option<&str> {
        match self.kind {
            TagKind::Said => self.attribute("who"),
            _ => None,
        }
    }
}

/// Elements the reader treats as document structure, never as inline tags
const STRUCTURAL_ELEMENTS: &[&str] = &["TEI", "teiHeader", "text", "body"];

/// Check that a tag of `kind` with `attributes` can be written as an inline
/// element and read back unchanged
pub fn check_markup(kind: &TagKind, attributes: &BTreeMap<String, String>) -> Result<(), MarkupError> {
    let element = kind.element_name();
    if !is_xml_name(element)
        || element.contains(':')
        || STRUCTURAL_ELEMENTS.contains(&element)
        || PASSAGE_ELEMENTS.contains(&element)
    {
        return Err(MarkupError::ElementName(element.to_string()));
    }

    for key in attributes.keys() {
        if key == "xml:id" || key == "xmlns" || key.starts_with("xmlns:") {
            return Err(MarkupError::ReservedAttribute(key.clone()));
        }
        if !is_xml_name(key) {
            return Err(MarkupError::AttributeName(key.clone()));
        }
    }
    Ok(())
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// One paragraph-level unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub index: usize,
    pub content: Arc<str>,
    pub tags: SharedList<Tag>,
}

impl Passage {
    /// Content length in chars; tag ranges are measured against this
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn tag(&self, tag_id: &str) -> Option<&Tag> {
        self.tags.find(|tag| tag.id == tag_id)
    }

    /// Text covered by `range`, or `None` when the range is out of bounds
    pub fn slice(&self, range: &TagRange) -> Option<&str> {
        if range.start > range.end {
            return None;
        }
        let start = char_to_byte(&self.content, range.start)?;
        let end = char_to_byte(&self.content, range.end)?;
        Some(&self.content[start..end])
    }
}

/// Byte offset of the `char_index`-th char, allowing one-past-the-end
pub fn char_to_byte(text: &str, char_index: usize) -> Option<usize> {
    if char_index == 0 {
        return Some(0);
    }
    let mut count = 0;
    for (byte, _) in text.char_indices() {
        if count == char_index {
            return Some(byte);
        }
        count += 1;
    }
    (count == char_index).then_some(text.len())
}

/// Speaker lookup record derived from a `said` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueEntry {
    pub tag_id: String,
    pub passage_id: String,
    pub speaker: String,
    pub range: TagRange,
}

impl DialogueEntry {
    /// Entry for `tag` when it is a `said` tag with a speaker
    pub fn from_tag(passage_id: &str, tag: &Tag) -> Option<Self> {
        tag.speaker().map(|speaker| Self {
            tag_id: tag.id.clone(),
            passage_id: passage_id.to_string(),
            speaker: speaker.to_string(),
            range: tag.range,
        })
    }
}

/// Entity discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Character,
    Place,
    Organization,
    Relationship,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "character",
            EntityType::Place => "place",
            EntityType::Organization => "organization",
            EntityType::Relationship => "relationship",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub xml_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub xml_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub xml_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Closed union over the entity kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entity {
    Character(Character),
    Place(Place),
    Organization(Organization),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Character(_) => EntityType::Character,
            Entity::Place(_) => EntityType::Place,
            Entity::Organization(_) => EntityType::Organization,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Character(c) => &c.id,
            Entity::Place(p) => &p.id,
            Entity::Organization(o) => &o.id,
        }
    }

    pub fn xml_id(&self) -> &str {
        match self {
            Entity::Character(c) => &c.xml_id,
            Entity::Place(p) => &p.xml_id,
            Entity::Organization(o) => &o.xml_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Character(c) => &c.name,
            Entity::Place(p) => &p.name,
            Entity::Organization(o) => &o.name,
        }
    }
}

/// Link between two characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: String,
    #[serde(default)]
    pub mutual: bool,
}

impl Relationship {
    pub fn involves(&self, character_id: &str) -> bool {
        self.from == character_id || self.to == character_id
    }
}

/// Materialized document value at one revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub revision: u64,
    pub metadata: Arc<Metadata>,
    pub passages: SharedList<Passage>,
    pub characters: SharedList<Character>,
    pub relationships: SharedList<Relationship>,
    pub dialogue: SharedList<DialogueEntry>,
    /// Source text the document was loaded from
    pub xml: Arc<str>,
}

impl DocumentState {
    pub fn passage(&self, passage_id: &str) -> Option<&Passage> {
        self.passages.find(|p| p.id == passage_id)
    }

    pub fn character(&self, character_id: &str) -> Option<&Character> {
        self.characters.find(|c| c.id == character_id)
    }

    pub fn relationship(&self, relationship_id: &str) -> Option<&Relationship> {
        self.relationships.find(|r| r.id == relationship_id)
    }

    /// Dialogue entries attributed to `speaker`
    pub fn dialogue_by(&self, speaker: &str) -> Vec<&DialogueEntry> {
        self.dialogue.iter().filter(|d| d.speaker == speaker).collect()
    }

    pub fn tag_count(&self) -> usize {
        self.passages.iter().map(|p| p.tags.len()).sum()
    }
}
