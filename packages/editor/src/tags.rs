//! # Tag Range Operations
//!
//! Range-safe annotation of passage text.
//!
//! Tag ranges are absolute char offsets into the passage's content, which
//! never changes after load. Inserting or removing a tag therefore never
//! shifts its siblings, and every tag stays addressable by id.
//!
//! Tags are kept in canonical order: start ascending, end descending, then
//! insertion order. This is the order the reader produces, so a document
//! written out and read back lists its tags the same way.

use crate::{DeltaError, EditorError};
use std::collections::BTreeMap;
use tei_parser::{check_markup, DialogueEntry, Passage, SharedList, Tag, TagKind, TagRange};

/// Check `0 <= start < end <= passage length`
pub fn validate_range(passage: &Passage, range: &TagRange) -> Result<(), EditorError> {
    let len = passage.char_len();
    if range.start >= range.end || range.end > len {
        return Err(EditorError::InvalidRange { range: *range, len });
    }
    Ok(())
}

/// Reject a range that would cross an existing tag in `passage`
pub fn validate_nesting(passage: &Passage, range: &TagRange) -> Result<(), EditorError> {
    match passage.tags.find(|t| t.range.crosses(range)) {
        Some(tag) => Err(EditorError::CrossingRange {
            range: *range,
            tag_id: tag.id.clone(),
        }),
        None => Ok(()),
    }
}

/// Reject a kind or attribute key that cannot be written as inline XML
pub fn validate_markup(kind: &TagKind, attributes: &BTreeMap<String, String>) -> Result<(), EditorError> {
    check_markup(kind, attributes).map_err(|e| {
        EditorError::from(DeltaError::InvalidField {
            field: e.field(),
            reason: e.to_string(),
        })
    })
}

/// `said` tag attributed to `speaker`
pub fn said_tag(id: String, range: TagRange, speaker: &str) -> Tag {
    let mut attributes = BTreeMap::new();
    attributes.insert("who".to_string(), speaker.to_string());
    Tag {
        id,
        kind: TagKind::Said,
        range,
        attributes,
    }
}

/// Passage with `tag` added at its canonical position
pub fn insert_tag(passage: &Passage, tag: Tag) -> Passage {
    let key = |t: &Tag| (t.range.start, std::cmp::Reverse(t.range.end));
    let at = passage
        .tags
        .position(|existing| key(existing) > key(&tag))
        .unwrap_or(passage.tags.len());

    Passage {
        id: passage.id.clone(),
        index: passage.index,
        content: passage.content.clone(),
        tags: passage.tags.with_inserted(at, tag),
    }
}

/// Passage without the tag `tag_id`, plus the removed tag
pub fn remove_tag(passage: &Passage, tag_id: &str) -> Option<(Passage, Tag)> {
    let at = passage.tags.position(|t| t.id == tag_id)?;
    let removed = passage.tags[at].clone();

    Some((
        Passage {
            id: passage.id.clone(),
            index: passage.index,
            content: passage.content.clone(),
            tags: passage.tags.with_removed(at),
        },
        removed,
    ))
}

pub fn find_passage<'a>(passages: &'a SharedList<Passage>, passage_id: &str) -> Option<(usize, &'a Passage)> {
    let at = passages.position(|p| p.id == passage_id)?;
    Some((at, &passages[at]))
}

/// Passage index and tag for `tag_id`, searching every passage
pub fn find_tag<'a>(passages: &'a SharedList<Passage>, tag_id: &str) -> Option<(usize, &'a Tag)> {
    passages
        .iter()
        .enumerate()
        .find_map(|(at, passage)| passage.tag(tag_id).map(|tag| (at, tag)))
}

/// Dialogue record derived from `tag`, if it is an attributed `said`
pub fn dialogue_for(passage: &Passage, tag: &Tag) -> Option<DialogueEntry> {
    DialogueEntry::from_tag(&passage.id, tag)
}

/// Text the tag covers
pub fn covered_text<'a>(passage: &'a Passage, tag: &Tag) -> Option<&'a str> {
    passage.slice(&tag.range)
}

/// Tags in `passage` whose range overlaps `range`
pub fn tags_overlapping<'a>(passage: &'a Passage, range: &TagRange) -> Vec<&'a Tag> {
    passage.tags.iter().filter(|t| t.range.overlaps(range)).collect()
}
