//! Tests for longer mutation sequences
//!
//! This tests:
//! - JSON mutation scripts applied in order
//! - Undo/redo walks across mixed tag and entity edits
//! - Edits after undo discarding the abandoned future
//! - Document integrity after a complex sequence

use anyhow::Result;
use tei_editor::{mutations_from_json, Document, EditorError, Event, Mutation, TagKind, TagRange};

const SOURCE: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc><titleStmt><title>Letters</title><author>Anon</author></titleStmt></fileDesc>
    <profileDesc><particDesc><listPerson>
      <person xml:id="clara" sex="F"><persName>Clara</persName><persName>Clärchen</persName></person>
    </listPerson></particDesc></profileDesc>
  </teiHeader>
  <text><body>
    <p>«Robert!» rief Clara über den Hof.</p>
    <p>Er antwortete nicht.</p>
    <l>Im wunderschönen Monat Mai</l>
  </body></text>
</TEI>"#;

fn apply_all(doc: &Document, mutations: Vec<Mutation>) -> Result<Document, EditorError> {
    mutations.into_iter().try_fold(doc.clone(), |doc, m| doc.apply(m))
}

#[test]
fn test_json_script_applies_in_order() -> Result<()> {
    let doc = Document::load(SOURCE)?;
    let p0 = doc.state.passages[0].id.clone();
    let p2 = doc.state.passages[2].id.clone();

    let script = format!(
        r##"[
            {{"op": "addCharacter", "id": "robert", "xmlId": "robert", "name": "Robert", "sex": "M"}},
            {{"op": "addSaidTag", "passageId": "{p0}", "range": {{"start": 0, "end": 9}}, "speaker": "#clara"}},
            {{"op": "addTag", "passageId": "{p0}", "range": {{"start": 1, "end": 7}}, "kind": "persName", "attributes": {{"ref": "#robert"}}}},
            {{"op": "addTag", "passageId": "{p2}", "range": {{"start": 3, "end": 16}}, "kind": "q"}},
            {{"op": "addRelationship", "from": "clara", "to": "robert", "kind": "spouse", "mutual": true}}
        ]"##
    );

    let end = apply_all(&doc, mutations_from_json(&script)?)?;

    assert_eq!(end.state.revision, 5);
    let kinds: Vec<_> = end.events.iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec!["loaded", "characterAdded", "saidTagAdded", "tagAdded", "tagAdded", "relationshipAdded"]
    );

    let passage = &end.state.passages[0];
    assert_eq!(passage.tags.len(), 2);
    assert_eq!(passage.tags[0].kind, TagKind::Said);
    assert_eq!(passage.slice(&passage.tags[0].range), Some("«Robert!»"));
    assert_eq!(passage.slice(&passage.tags[1].range), Some("Robert"));

    let line = &end.state.passages[2];
    assert_eq!(line.slice(&line.tags[0].range), Some("wunderschönen"));

    assert_eq!(end.state.dialogue_by("clara").len(), 1);
    assert_eq!(end.state.relationships[0].kind, "spouse");
    Ok(())
}

#[test]
fn test_failing_step_stops_script() -> Result<()> {
    let doc = Document::load(SOURCE)?;
    let p1 = doc.state.passages[1].id.clone();

    let script = format!(
        r#"[
            {{"op": "addSaidTag", "passageId": "{p1}", "range": {{"start": 0, "end": 20}}, "speaker": "robert"}},
            {{"op": "addSaidTag", "passageId": "{p1}", "range": {{"start": 0, "end": 21}}, "speaker": "robert"}}
        ]"#
    );

    let err = apply_all(&doc, mutations_from_json(&script)?).unwrap_err();
    assert_eq!(
        err,
        EditorError::InvalidRange {
            range: TagRange::new(0, 21),
            len: 20
        }
    );
    assert_eq!(doc.state.revision, 0);
    Ok(())
}

#[test]
fn test_undo_redo_walk_over_mixed_edits() -> Result<()> {
    let doc = Document::load(SOURCE)?;
    let p0 = doc.state.passages[0].id.clone();

    let end = doc
        .add_said_tag(&p0, TagRange::new(0, 9), "clara")?
        .add_character(tei_editor::entity::new_character("Robert Schumann"))?;
    let robert = end.state.characters[1].id.clone();
    let end = end.add_relationship("clara", &robert, "spouse", true)?.remove_character(&robert)?;

    assert_eq!(end.state.revision, 4);
    assert!(end.state.relationships.is_empty());

    let mut cursor = end.clone();
    let mut seen = vec![cursor.state.clone()];
    while cursor.can_undo() {
        cursor = cursor.undo_to(cursor.revision() - 1)?;
        seen.push(cursor.state.clone());
    }
    assert_eq!(cursor.revision(), 0);
    assert_eq!(cursor.state.characters.len(), 1);
    assert_eq!(cursor.state.tag_count(), 0);

    let at3 = end.undo_to(3)?;
    assert_eq!(at3.state.characters.len(), 2);
    assert_eq!(at3.state.relationships.len(), 1);

    while cursor.can_redo() {
        cursor = cursor.redo_from(cursor.revision())?;
    }
    assert_eq!(cursor.state, end.state);
    assert_eq!(seen.len(), 5);
    Ok(())
}

#[test]
fn test_edit_after_undo_discards_future() -> Result<()> {
    let doc = Document::load(SOURCE)?;
    let p0 = doc.state.passages[0].id.clone();
    let p1 = doc.state.passages[1].id.clone();

    let head = doc
        .add_said_tag(&p0, TagRange::new(0, 9), "clara")?
        .add_said_tag(&p1, TagRange::new(0, 20), "clara")?
        .add_tag(&p1, TagRange::new(0, 2), TagKind::PersName, Default::default())?;
    assert_eq!(head.latest_revision(), 3);

    let rewound = head.undo_to(1)?;
    assert_eq!(rewound.latest_revision(), 3);

    let forked = rewound.add_tag(&p0, TagRange::new(9, 15), TagKind::Q, Default::default())?;
    assert_eq!(forked.latest_revision(), 2);
    assert_eq!(forked.state.tag_count(), 2);
    assert_eq!(forked.state.passages[1].tags.len(), 0);
    assert!(matches!(
        forked.redo_from(2),
        Err(EditorError::NoFutureRevision { from: 2, latest: 2 })
    ));

    assert!(rewound.events.shares_item(1, &forked.events, 1));
    assert_eq!(head.events.len(), 4);
    Ok(())
}

#[test]
fn test_document_integrity_after_complex_sequence() -> Result<()> {
    let doc = Document::load(SOURCE)?;
    let ids: Vec<_> = doc.state.passages.iter().map(|p| p.id.clone()).collect();

    let mut current = doc.clone();
    for (i, id) in ids.iter().enumerate() {
        current = current.add_said_tag(id, TagRange::new(0, 2), "clara")?;
        if i % 2 == 0 {
            let tag_id = current.state.passages[i].tags[0].id.clone();
            current = current.remove_tag(&tag_id)?;
        }
    }

    let after: Vec<_> = current.state.passages.iter().map(|p| p.id.clone()).collect();
    assert_eq!(after, ids);
    assert_eq!(current.state.tag_count(), 1);
    assert_eq!(current.state.dialogue.len(), 1);
    assert_eq!(current.state.dialogue[0].passage_id, ids[1]);

    for (before, after) in doc.state.passages.iter().zip(current.state.passages.iter()) {
        assert_eq!(before.content, after.content);
    }

    let rebuilt = Document::from_events(current.events.clone())?;
    assert_eq!(rebuilt, current);
    Ok(())
}
