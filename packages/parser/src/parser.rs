//! TEI reader.
//!
//! Streams the source with `quick-xml` and builds the initial
//! [`DocumentState`] (revision 0):
//!
//! - metadata from the first `<title>` / `<author>` of `<teiHeader>`
//! - one passage per `<p>`, `<ab>` or `<l>` inside `<body>`; nested markup
//!   is flattened into the passage text and kept as tags with char ranges
//! - one character per `<person>`, one relationship per `<relation>`

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::id_generator::{loaded_tag_id, xml_id_or, PassageIdGenerator};
use crate::shared::SharedList;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Elements that open a passage inside `<body>`
pub const PASSAGE_ELEMENTS: &[&str] = &["p", "ab", "l"];

pub fn parse(source: &str) -> ParseResult<DocumentState> {
    Parser::new(source).parse()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CaptureTarget {
    Title,
    Author,
    PersName,
    Note,
}

/// Text collected for a header field or person child
struct Capture {
    target: CaptureTarget,
    depth: usize,
    text: String,
}

struct OpenTag {
    kind: TagKind,
    xml_id: Option<String>,
    attributes: BTreeMap<String, String>,
    start: usize,
    ordinal: usize,
}

struct PendingTag {
    ordinal: usize,
    xml_id: Option<String>,
    tag: Tag,
}

struct PassageBuilder {
    depth: usize,
    pos: usize,
    text: String,
    char_len: usize,
    open: Vec<OpenTag>,
    closed: Vec<PendingTag>,
    opened: usize,
}

#[derive(Default)]
struct PersonBuilder {
    depth: usize,
    xml_id: Option<String>,
    sex: Option<String>,
    names: Vec<String>,
    note: Option<String>,
}

pub struct Parser<'a> {
    source: &'a str,
    stack: Vec<(String, usize)>,
    metadata: Metadata,
    saw_body: bool,
    header_depth: Option<usize>,
    body_depth: Option<usize>,
    capture: Option<Capture>,
    passage: Option<PassageBuilder>,
    person: Option<PersonBuilder>,
    passages: Vec<Passage>,
    characters: Vec<Character>,
    relationships: Vec<Relationship>,
    passage_ids: PassageIdGenerator,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: Vec::new(),
            metadata: Metadata::default(),
            saw_body: false,
            header_depth: None,
            body_depth: None,
            capture: None,
            passage: None,
            person: None,
            passages: Vec::new(),
            characters: Vec::new(),
            relationships: Vec::new(),
            passage_ids: PassageIdGenerator::new(),
        }
    }

    #[instrument(skip_all)]
    pub fn parse(mut self) -> ParseResult<DocumentState> {
        let mut reader = Reader::from_str(self.source);
        reader.config_mut().check_end_names = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|err| ParseError::xml(reader.buffer_position() as usize, err.to_string()))?;
            let pos = reader.buffer_position() as usize;

            match event {
                Event::Start(e) => self.start_element(&e, pos)?,
                Event::Empty(e) => self.empty_element(&e, pos)?,
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.end_element(name, pos)?;
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| ParseError::xml(pos, err.to_string()))?;
                    self.text(&text);
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    self.text(&text);
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
            }
        }

        if let Some((name, pos)) = self.stack.pop() {
            return Err(ParseError::unclosed(pos, name));
        }
        if !self.saw_body {
            return Err(ParseError::missing("body"));
        }

        let dialogue: Vec<DialogueEntry> = self
            .passages
            .iter()
            .flat_map(|passage| {
                passage
                    .tags
                    .iter()
                    .filter_map(|tag| DialogueEntry::from_tag(&passage.id, tag))
                    .collect::<Vec<_>>()
            })
            .collect();

        debug!(
            bytes = self.source.len(),
            passages = self.passages.len(),
            characters = self.characters.len(),
            relationships = self.relationships.len(),
            dialogue = dialogue.len(),
            "Parsed TEI document"
        );

        Ok(DocumentState {
            revision: 0,
            metadata: Arc::new(self.metadata),
            passages: SharedList::from_vec(self.passages),
            characters: SharedList::from_vec(self.characters),
            relationships: SharedList::from_vec(self.relationships),
            dialogue: SharedList::from_vec(dialogue),
            xml: Arc::from(self.source),
        })
    }

    fn start_element(&mut self, e: &BytesStart, pos: usize) -> ParseResult<()> {
        let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name = local_name(e);
        self.stack.push((qname, pos));
        let depth = self.stack.len();

        if let Some(passage) = &mut self.passage {
            let (xml_id, attributes) = tag_attributes(read_attributes(e, pos)?);
            passage.open.push(OpenTag {
                kind: TagKind::from_element(&name),
                xml_id,
                attributes,
                start: passage.char_len,
                ordinal: passage.opened,
            });
            passage.opened += 1;
            return Ok(());
        }

        if self.capture.is_some() {
            // Nested markup inside a captured field contributes its text only
            return Ok(());
        }

        match name.as_str() {
            "teiHeader" if self.header_depth.is_none() => self.header_depth = Some(depth),
            "body" if self.body_depth.is_none() => {
                self.body_depth = Some(depth);
                self.saw_body = true;
            }
            "title" if self.in_header() && self.metadata.title.is_empty() => {
                self.begin_capture(CaptureTarget::Title, depth)
            }
            "author" if self.in_header() && self.metadata.author.is_empty() => {
                self.begin_capture(CaptureTarget::Author, depth)
            }
            "person" => {
                let mut person = PersonBuilder {
                    depth,
                    ..PersonBuilder::default()
                };
                for (key, value) in read_attributes(e, pos)? {
                    match key.as_str() {
                        "xml:id" | "id" => person.xml_id = Some(value),
                        "sex" => person.sex = Some(value),
                        _ => {}
                    }
                }
                self.person = Some(person);
            }
            "persName" if self.person.is_some() => self.begin_capture(CaptureTarget::PersName, depth),
            "note" if self.person.is_some() => self.begin_capture(CaptureTarget::Note, depth),
            "relation" => self.relation(e, pos)?,
            _ if self.body_depth.is_some() && PASSAGE_ELEMENTS.contains(&name.as_str()) => {
                self.passage = Some(PassageBuilder {
                    depth,
                    pos,
                    text: String::new(),
                    char_len: 0,
                    open: Vec::new(),
                    closed: Vec::new(),
                    opened: 0,
                });
            }
            _ => {}
        }

        Ok(())
    }

    fn empty_element(&mut self, e: &BytesStart, pos: usize) -> ParseResult<()> {
        let name = local_name(e);

        if self.passage.is_some() {
            debug!(element = %name, "Ignoring empty element inside passage");
            return Ok(());
        }

        match name.as_str() {
            "relation" => self.relation(e, pos)?,
            "body" => self.saw_body = true,
            _ => {}
        }
        Ok(())
    }

    fn end_element(&mut self, name: String, pos: usize) -> ParseResult<()> {
        let (open_name, _) = self
            .stack
            .pop()
            .ok_or_else(|| ParseError::xml(pos, format!("unexpected end tag </{}>", name)))?;
        if open_name != name {
            return Err(ParseError::mismatched_end_tag(pos, open_name, name));
        }
        let depth = self.stack.len() + 1;

        if self.passage.as_ref().map(|p| p.depth) == Some(depth) {
            if let Some(passage) = self.passage.take() {
                self.finish_passage(passage)?;
            }
            return Ok(());
        }

        if let Some(passage) = &mut self.passage {
            if let Some(open) = passage.open.pop() {
                if open.start < passage.char_len {
                    passage.closed.push(PendingTag {
                        ordinal: open.ordinal,
                        xml_id: open.xml_id,
                        tag: Tag {
                            id: String::new(),
                            kind: open.kind,
                            range: TagRange::new(open.start, passage.char_len),
                            attributes: open.attributes,
                        },
                    });
                } else {
                    debug!(element = %name, "Dropping zero-length inline element");
                }
            }
            return Ok(());
        }

        if let Some(capture_depth) = self.capture.as_ref().map(|c| c.depth) {
            if capture_depth == depth {
                self.finish_capture();
            }
            return Ok(());
        }

        if self.person.as_ref().map(|p| p.depth) == Some(depth) {
            if let Some(person) = self.person.take() {
                self.finish_person(person);
            }
        }
        if self.header_depth == Some(depth) {
            self.header_depth = None;
        }
        if self.body_depth == Some(depth) {
            self.body_depth = None;
        }

        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(passage) = &mut self.passage {
            passage.text.push_str(text);
            passage.char_len += text.chars().count();
        } else if let Some(capture) = &mut self.capture {
            capture.text.push_str(text);
        }
    }

    fn in_header(&self) -> bool {
        self.header_depth.is_some()
    }

    fn begin_capture(&mut self, target: CaptureTarget, depth: usize) {
        self.capture = Some(Capture {
            target,
            depth,
            text: String::new(),
        });
    }

    fn finish_capture(&mut self) {
        let Some(capture) = self.capture.take() else {
            return;
        };
        let text = normalize_whitespace(&capture.text);

        match capture.target {
            CaptureTarget::Title => self.metadata.title = text,
            CaptureTarget::Author => self.metadata.author = text,
            CaptureTarget::PersName => {
                if let Some(person) = &mut self.person {
                    if !text.is_empty() {
                        person.names.push(text);
                    }
                }
            }
            CaptureTarget::Note => {
                if let Some(person) = &mut self.person {
                    if !text.is_empty() {
                        person.note = Some(text);
                    }
                }
            }
        }
    }

    fn finish_person(&mut self, person: PersonBuilder) {
        let mut names = person.names.into_iter();
        let name = names.next();
        let ordinal = self.characters.len() + 1;
        let xml_id = person
            .xml_id
            .clone()
            .or_else(|| name.as_deref().map(|n| xml_id_or(n, || format!("person-{}", ordinal))))
            .filter(|id| !id.is_empty());

        let Some(xml_id) = xml_id else {
            warn!("Skipping <person> without xml:id or name");
            return;
        };

        if self.characters.iter().any(|c| c.id == xml_id) {
            warn!(id = %xml_id, "Skipping <person> with a duplicate xml:id");
            return;
        }

        self.characters.push(Character {
            id: xml_id.clone(),
            name: name.unwrap_or_else(|| xml_id.clone()),
            xml_id,
            sex: person.sex,
            aliases: names.collect(),
            description: person.note,
        });
    }

    fn relation(&mut self, e: &BytesStart, pos: usize) -> ParseResult<()> {
        let mut xml_id = None;
        let mut kind = None;
        let mut active = None;
        let mut passive = None;
        let mut mutual = None;

        for (key, value) in read_attributes(e, pos)? {
            match key.as_str() {
                "xml:id" | "id" => xml_id = Some(value),
                "name" | "type" if kind.is_none() => kind = Some(value),
                "active" => active = Some(value),
                "passive" => passive = Some(value),
                "mutual" => mutual = Some(value),
                _ => {}
            }
        }

        let endpoints = match (&active, &passive, &mutual) {
            (Some(a), Some(p), _) => first_pointer(a).zip(first_pointer(p)).map(|ends| (ends, false)),
            (_, _, Some(m)) => {
                let mut ends = pointers(m);
                ends.next().zip(ends.next()).map(|ends| (ends, true))
            }
            _ => None,
        };

        let Some(((from, to), is_mutual)) = endpoints else {
            warn!(pos, "Skipping <relation> without two endpoints");
            return Ok(());
        };

        let id = xml_id.unwrap_or_else(|| format!("relation-{}", self.relationships.len() + 1));
        if self.relationships.iter().any(|r| r.id == id) {
            warn!(pos, id = %id, "Skipping <relation> with a duplicate xml:id");
            return Ok(());
        }
        self.relationships.push(Relationship {
            id,
            from,
            to,
            kind: kind.unwrap_or_else(|| "related".to_string()),
            mutual: is_mutual,
        });
        Ok(())
    }

    fn finish_passage(&mut self, mut builder: PassageBuilder) -> ParseResult<()> {
        if let Some(open) = builder.open.last() {
            return Err(ParseError::InvalidPassage {
                pos: builder.pos,
                message: format!("inline <{}> is never closed", open.kind),
            });
        }

        if builder.text.trim().is_empty() {
            debug!(pos = builder.pos, "Skipping empty passage");
            return Ok(());
        }

        let index = self.passages.len();
        let id = self.passage_ids.new_id(&builder.text, index);

        builder
            .closed
            .sort_by_key(|pending| (pending.tag.range.start, Reverse(pending.tag.range.end), pending.ordinal));

        let tags: Vec<Tag> = builder
            .closed
            .into_iter()
            .enumerate()
            .map(|(n, pending)| Tag {
                id: pending.xml_id.unwrap_or_else(|| loaded_tag_id(&id, n + 1)),
                ..pending.tag
            })
            .collect();

        self.passages.push(Passage {
            id,
            index,
            content: Arc::from(builder.text),
            tags: SharedList::from_vec(tags),
        });
        Ok(())
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn read_attributes(e: &BytesStart, pos: usize) -> ParseResult<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::xml(pos, err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::xml(pos, err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

/// Split inline attributes into the element id and the opaque attribute map
fn tag_attributes(raw: Vec<(String, String)>) -> (Option<String>, BTreeMap<String, String>) {
    let mut xml_id = None;
    let mut attributes = BTreeMap::new();

    for (key, value) in raw {
        match key.as_str() {
            "xml:id" => xml_id = Some(value),
            k if k == "xmlns" || k.starts_with("xmlns:") => {}
            "who" => {
                attributes.insert(key, pointers(&value).collect::<Vec<_>>().join(" "));
            }
            _ => {
                attributes.insert(key, value);
            }
        }
    }

    (xml_id, attributes)
}

/// Whitespace-separated TEI pointers with the leading `#` removed
fn pointers(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split_whitespace()
        .map(|p| p.trim_start_matches('#').to_string())
        .filter(|p| !p.is_empty())
}

fn first_pointer(value: &str) -> Option<String> {
    pointers(value).next()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title>Test Novel</title>
        <author>Jane Author</author>
      </titleStmt>
    </fileDesc>
    <profileDesc>
      <particDesc>
        <listPerson>
          <person xml:id="jdoe" sex="M">
            <persName>John Doe</persName>
            <persName>Johnny</persName>
            <note>The narrator.</note>
          </person>
          <person sex="F">
            <persName>Jane Smith</persName>
          </person>
        </listPerson>
        <listRelation>
          <relation name="sibling" mutual="#jdoe #jane-smith"/>
        </listRelation>
      </particDesc>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <p><said who="#jdoe" direct="true">"Hello there,"</said> said John.</p>
      <p>Jane nodded &amp; smiled.<lb/></p>
      <p>   </p>
    </body>
  </text>
</TEI>"##;

    #[test]
    fn test_parse_metadata() {
        let state = parse(SAMPLE).unwrap();
        assert_eq!(state.metadata.title, "Test Novel");
        assert_eq!(state.metadata.author, "Jane Author");
        assert_eq!(state.revision, 0);
    }

    #[test]
    fn test_parse_passages_with_stable_ids() {
        let state = parse(SAMPLE).unwrap();
        assert_eq!(state.passages.len(), 2);

        let first = &state.passages[0];
        assert_eq!(first.index, 0);
        assert_eq!(&*first.content, "\"Hello there,\" said John.");
        assert!(first.id.starts_with("passage-"));
        assert_eq!(first.id.len(), "passage-".len() + 12);

        let second = &state.passages[1];
        assert_eq!(&*second.content, "Jane nodded & smiled.");
        assert_ne!(first.id, second.id);

        let again = parse(SAMPLE).unwrap();
        assert_eq!(again.passages[0].id, first.id);
    }

    #[test]
    fn test_inline_markup_becomes_tags() {
        let state = parse(SAMPLE).unwrap();
        let passage = &state.passages[0];
        assert_eq!(passage.tags.len(), 1);

        let tag = &passage.tags[0];
        assert_eq!(tag.kind, TagKind::Said);
        assert_eq!(tag.range, TagRange::new(0, 14));
        assert_eq!(tag.attribute("who"), Some("jdoe"));
        assert_eq!(tag.attribute("direct"), Some("true"));
        assert_eq!(tag.id, format!("{}-t1", passage.id));
        assert_eq!(passage.slice(&tag.range), Some("\"Hello there,\""));

        assert_eq!(state.dialogue.len(), 1);
        assert_eq!(state.dialogue[0].speaker, "jdoe");
        assert_eq!(state.dialogue[0].passage_id, passage.id);
    }

    #[test]
    fn test_parse_characters_and_relations() {
        let state = parse(SAMPLE).unwrap();
        assert_eq!(state.characters.len(), 2);

        let john = &state.characters[0];
        assert_eq!(john.id, "jdoe");
        assert_eq!(john.name, "John Doe");
        assert_eq!(john.sex.as_deref(), Some("M"));
        assert_eq!(john.aliases, vec!["Johnny".to_string()]);
        assert_eq!(john.description.as_deref(), Some("The narrator."));

        let jane = &state.characters[1];
        assert_eq!(jane.id, "jane-smith");
        assert_eq!(jane.xml_id, "jane-smith");

        assert_eq!(state.relationships.len(), 1);
        let relation = &state.relationships[0];
        assert_eq!(relation.from, "jdoe");
        assert_eq!(relation.to, "jane-smith");
        assert_eq!(relation.kind, "sibling");
        assert!(relation.mutual);
    }

    #[test]
    fn test_nested_tags_are_ordered_by_start_then_outer_first() {
        let source = r#"<TEI><text><body>
            <p><q>Where is <persName>Anna</persName>?</q> <persName xml:id="n1">Bob</persName> asked.</p>
        </body></text></TEI>"#;
        let state = parse(source).unwrap();
        let passage = &state.passages[0];
        let kinds: Vec<_> = passage.tags.iter().map(|t| t.kind.clone()).collect();

        assert_eq!(kinds, vec![TagKind::Q, TagKind::PersName, TagKind::PersName]);
        assert_eq!(passage.tags[0].range, TagRange::new(0, 14));
        assert_eq!(passage.slice(&passage.tags[1].range), Some("Anna"));
        assert_eq!(passage.tags[2].id, "n1");
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let source = "<TEI><teiHeader><fileDesc/></teiHeader></TEI>";
        assert_eq!(parse(source), Err(ParseError::missing("body")));
    }

    #[test]
    fn test_mismatched_end_tag_is_an_error() {
        let source = "<TEI><text><body><p>Hi</div></body></text></TEI>";
        match parse(source) {
            Err(ParseError::MismatchedEndTag { expected, found, .. }) => {
                assert_eq!(expected, "p");
                assert_eq!(found, "div");
            }
            other => panic!("expected mismatched end tag, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_root_is_an_error() {
        let source = "<TEI><text><body><p>Hi</p></body></text>";
        assert!(parse(source).is_err());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(parse("not xml at all <<<").is_err());
    }

    #[test]
    fn test_multibyte_ranges_count_chars() {
        let source = "<TEI><text><body><p>«<said who=\"#a\">Très bien</said>», dit-elle.</p></body></text></TEI>";
        let state = parse(source).unwrap();
        let tag = &state.passages[0].tags[0];
        assert_eq!(tag.range, TagRange::new(1, 10));
        assert_eq!(state.passages[0].slice(&tag.range), Some("Très bien"));
    }
}
