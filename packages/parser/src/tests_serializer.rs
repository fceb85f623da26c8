/// Tests to verify the serializer round-trips everything the reader produces
use crate::ast::*;
use crate::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const NOVEL: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title>Pride &amp; Prejudice</title>
        <author>Jane Austen</author>
      </titleStmt>
    </fileDesc>
    <profileDesc>
      <particDesc>
        <listPerson>
          <person xml:id="eliza" sex="F">
            <persName>Elizabeth Bennet</persName>
            <persName>Lizzy</persName>
          </person>
          <person xml:id="darcy" sex="M">
            <persName>Fitzwilliam Darcy</persName>
            <note>Owner of Pemberley.</note>
          </person>
        </listPerson>
        <listRelation>
          <relation name="suitor" active="#darcy" passive="#eliza"/>
        </listRelation>
      </particDesc>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <p><said who="#eliza" aloud="true">"I am perfectly convinced by it that <persName>Mr. Darcy</persName> has no defect."</said></p>
      <p>She smiled &lt;slightly&gt; at <q>the</q> <q>thought</q>.</p>
      <p>A plain passage.</p>
    </body>
  </text>
</TEI>"##;

#[test]
fn test_roundtrip_preserves_loaded_state() {
    let original = parse(NOVEL).unwrap();
    let serialized = serialize(&original).unwrap();
    let reparsed = parse(&serialized).expect(&format!("Failed to reparse: {}", serialized));

    assert_eq!(reparsed.metadata, original.metadata);
    assert_eq!(reparsed.passages, original.passages);
    assert_eq!(reparsed.characters, original.characters);
    assert_eq!(reparsed.relationships, original.relationships);
    assert_eq!(reparsed.dialogue, original.dialogue);
}

#[test]
fn test_roundtrip_is_a_fixed_point() {
    let once = serialize(&parse(NOVEL).unwrap()).unwrap();
    let twice = serialize(&parse(&once).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_passage_ids_survive_roundtrip() {
    let original = parse(NOVEL).unwrap();
    let reparsed = parse(&serialize(&original).unwrap()).unwrap();

    let ids: Vec<_> = original.passages.iter().map(|p| p.id.clone()).collect();
    let again: Vec<_> = reparsed.passages.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, again);
}

#[test]
fn test_special_characters_are_escaped() {
    let state = parse(NOVEL).unwrap();
    let serialized = serialize(&state).unwrap();

    assert!(serialized.contains("<title>Pride &amp; Prejudice</title>"));
    assert!(serialized.contains("She smiled &lt;slightly&gt; at"));
}

#[test]
fn test_who_is_written_as_pointer() {
    let serialized = serialize(&parse(NOVEL).unwrap()).unwrap();
    assert!(serialized.contains("who=\"#eliza\""));
    assert!(serialized.contains("active=\"#darcy\" passive=\"#eliza\""));
}

#[test]
fn test_pointers_use_xml_ids_of_added_characters() {
    let mut state = parse(NOVEL).unwrap();
    let added = Character {
        id: "character-42".to_string(),
        xml_id: "mr-collins".to_string(),
        name: "Mr. Collins".to_string(),
        sex: None,
        aliases: vec![],
        description: None,
    };
    state.characters = state.characters.with_pushed(added);

    let mut attributes = BTreeMap::new();
    attributes.insert("who".to_string(), "character-42".to_string());
    let passage = state.passages[2].clone();
    let tagged = Passage {
        tags: passage.tags.with_pushed(Tag {
            id: "tag-1".to_string(),
            kind: TagKind::Said,
            range: TagRange::new(0, 7),
            attributes,
        }),
        ..passage
    };
    state.passages = state.passages.with_replaced(2, tagged);

    let serialized = serialize(&state).unwrap();
    assert!(serialized.contains("<person xml:id=\"mr-collins\">"));
    assert!(serialized.contains("<said xml:id=\"tag-1\" who=\"#mr-collins\">A plain</said> passage."));

    let reparsed = parse(&serialized).unwrap();
    assert_eq!(reparsed.dialogue_by("mr-collins").len(), 1);
}

#[test]
fn test_crossing_tags_cannot_be_serialized() {
    let passage = Passage {
        id: "passage-aaaaaaaaaaaa".to_string(),
        index: 0,
        content: Arc::from("one two three"),
        tags: vec![
            Tag {
                id: "a".to_string(),
                kind: TagKind::Q,
                range: TagRange::new(0, 7),
                attributes: BTreeMap::new(),
            },
            Tag {
                id: "b".to_string(),
                kind: TagKind::Q,
                range: TagRange::new(4, 13),
                attributes: BTreeMap::new(),
            },
        ]
        .into(),
    };

    let result = serializer::render_passage(&passage, &HashMap::new());
    assert_eq!(
        result,
        Err(SerializeError::OverlappingTags {
            passage_id: "passage-aaaaaaaaaaaa".to_string(),
            first: "a".to_string(),
            second: "b".to_string(),
        })
    );
}

#[test]
fn test_unwritable_markup_is_rejected() {
    let tagged = |kind: TagKind, key: &str| Passage {
        id: "passage-cccccccccccc".to_string(),
        index: 0,
        content: Arc::from("Hello"),
        tags: vec![Tag {
            id: "t1".to_string(),
            kind,
            range: TagRange::new(0, 5),
            attributes: BTreeMap::from([(key.to_string(), "custom".to_string())]),
        }]
        .into(),
    };

    let cases = [
        (tagged(TagKind::Q, "xml:id"), MarkupError::ReservedAttribute("xml:id".to_string())),
        (tagged(TagKind::Q, "bad key"), MarkupError::AttributeName("bad key".to_string())),
        (
            tagged(TagKind::Other("not an element".to_string()), "ref"),
            MarkupError::ElementName("not an element".to_string()),
        ),
    ];

    for (passage, source) in cases {
        assert_eq!(
            serializer::render_passage(&passage, &HashMap::new()),
            Err(SerializeError::InvalidMarkup {
                passage_id: "passage-cccccccccccc".to_string(),
                tag_id: "t1".to_string(),
                source,
            })
        );
    }
}

#[test]
fn test_identical_ranges_nest() {
    let passage = Passage {
        id: "passage-bbbbbbbbbbbb".to_string(),
        index: 0,
        content: Arc::from("Hi there"),
        tags: vec![
            Tag {
                id: "outer".to_string(),
                kind: TagKind::Said,
                range: TagRange::new(0, 2),
                attributes: BTreeMap::new(),
            },
            Tag {
                id: "inner".to_string(),
                kind: TagKind::Q,
                range: TagRange::new(0, 2),
                attributes: BTreeMap::new(),
            },
        ]
        .into(),
    };

    let markup = serializer::render_passage(&passage, &HashMap::new()).unwrap();
    assert_eq!(
        markup,
        "<said xml:id=\"outer\"><q xml:id=\"inner\">Hi</q></said> there"
    );
}

#[test]
fn test_custom_indent_and_no_declaration() {
    let state = parse(NOVEL).unwrap();
    let mut serializer = Serializer::with_options(SerializeOptions {
        indent: "\t".to_string(),
        xml_declaration: false,
    });
    let output = serializer.serialize(&state).unwrap();

    assert!(output.starts_with("<TEI"));
    assert!(output.contains("\n\t<teiHeader>"));
    assert_eq!(parse(&output).unwrap().passages, state.passages);
}
