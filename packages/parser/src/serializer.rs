use crate::ast::*;
use crate::error::SerializeError;
use quick_xml::escape::{escape, partial_escape};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::{debug, instrument};

pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Output options for [`Serializer`]
#[derive(Debug, Clone, PartialEq)]
pub struct SerializeOptions {
    pub indent: String,
    pub xml_declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            xml_declaration: true,
        }
    }
}

/// Serializer converts a document state back to TEI markup
///
/// Inline markup is rebuilt from each passage's tags. Passage text is written
/// verbatim (indentation is only added between block elements), so reading
/// the output back yields the same passages, tags and ids.
pub struct Serializer {
    indent_level: usize,
    options: SerializeOptions,
}

impl Serializer {
    pub fn new() -> Self {
        Self::with_options(SerializeOptions::default())
    }

    pub fn with_indent(indent: &str) -> Self {
        Self::with_options(SerializeOptions {
            indent: indent.to_string(),
            ..SerializeOptions::default()
        })
    }

    pub fn with_options(options: SerializeOptions) -> Self {
        Self {
            indent_level: 0,
            options,
        }
    }

    /// Serialize a document state to TEI XML
    #[instrument(skip_all, fields(passages = state.passages.len()))]
    pub fn serialize(&mut self, state: &DocumentState) -> Result<String, SerializeError> {
        let mut output = String::new();
        self.indent_level = 0;

        // Pointers are written against xml:ids so the output is valid TEI
        let xml_ids: HashMap<&str, &str> = state
            .characters
            .iter()
            .map(|c| (c.id.as_str(), c.xml_id.as_str()))
            .collect();

        if self.options.xml_declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }

        self.line(&mut output, &format!("<TEI xmlns=\"{}\">", TEI_NAMESPACE));
        self.indent_level += 1;

        self.serialize_header(state, &xml_ids, &mut output);

        self.line(&mut output, "<text>");
        self.indent_level += 1;
        self.line(&mut output, "<body>");
        self.indent_level += 1;
        for passage in state.passages.iter() {
            let markup = render_passage(passage, &xml_ids)?;
            self.line(&mut output, &format!("<p>{}</p>", markup));
        }
        self.indent_level -= 1;
        self.line(&mut output, "</body>");
        self.indent_level -= 1;
        self.line(&mut output, "</text>");

        self.indent_level -= 1;
        self.line(&mut output, "</TEI>");

        debug!(bytes = output.len(), "Serialized TEI document");
        Ok(output)
    }

    fn serialize_header(&mut self, state: &DocumentState, xml_ids: &HashMap<&str, &str>, output: &mut String) {
        self.line(output, "<teiHeader>");
        self.indent_level += 1;

        self.line(output, "<fileDesc>");
        self.indent_level += 1;
        self.line(output, "<titleStmt>");
        self.indent_level += 1;
        self.line(output, &format!("<title>{}</title>", partial_escape(&state.metadata.title)));
        self.line(output, &format!("<author>{}</author>", partial_escape(&state.metadata.author)));
        self.indent_level -= 1;
        self.line(output, "</titleStmt>");
        self.indent_level -= 1;
        self.line(output, "</fileDesc>");

        if !state.characters.is_empty() || !state.relationships.is_empty() {
            self.line(output, "<profileDesc>");
            self.indent_level += 1;
            self.line(output, "<particDesc>");
            self.indent_level += 1;

            if !state.characters.is_empty() {
                self.line(output, "<listPerson>");
                self.indent_level += 1;
                for character in state.characters.iter() {
                    self.serialize_person(character, output);
                }
                self.indent_level -= 1;
                self.line(output, "</listPerson>");
            }

            if !state.relationships.is_empty() {
                self.line(output, "<listRelation>");
                self.indent_level += 1;
                for relationship in state.relationships.iter() {
                    self.serialize_relation(relationship, xml_ids, output);
                }
                self.indent_level -= 1;
                self.line(output, "</listRelation>");
            }

            self.indent_level -= 1;
            self.line(output, "</particDesc>");
            self.indent_level -= 1;
            self.line(output, "</profileDesc>");
        }

        self.indent_level -= 1;
        self.line(output, "</teiHeader>");
    }

    fn serialize_person(&mut self, character: &Character, output: &mut String) {
        let mut open = format!("<person xml:id=\"{}\"", escape(&character.xml_id));
        if let Some(sex) = &character.sex {
            open.push_str(&format!(" sex=\"{}\"", escape(sex)));
        }
        open.push('>');
        self.line(output, &open);

        self.indent_level += 1;
        self.line(output, &format!("<persName>{}</persName>", partial_escape(&character.name)));
        for alias in &character.aliases {
            self.line(output, &format!("<persName>{}</persName>", partial_escape(alias)));
        }
        if let Some(description) = &character.description {
            self.line(output, &format!("<note>{}</note>", partial_escape(description)));
        }
        self.indent_level -= 1;

        self.line(output, "</person>");
    }

    fn serialize_relation(&mut self, relationship: &Relationship, xml_ids: &HashMap<&str, &str>, output: &mut String) {
        let from = pointer(xml_ids, &relationship.from);
        let to = pointer(xml_ids, &relationship.to);

        let ends = if relationship.mutual {
            format!("mutual=\"{} {}\"", escape(&from), escape(&to))
        } else {
            format!("active=\"{}\" passive=\"{}\"", escape(&from), escape(&to))
        };

        self.line(
            output,
            &format!(
                "<relation xml:id=\"{}\" name=\"{}\" {}/>",
                escape(&relationship.id),
                escape(&relationship.kind),
                ends
            ),
        );
    }

    fn line(&self, output: &mut String, content: &str) {
        for _ in 0..self.indent_level {
            output.push_str(&self.options.indent);
        }
        output.push_str(content);
        output.push('\n');
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to serialize with default options
pub fn serialize(state: &DocumentState) -> Result<String, SerializeError> {
    Serializer::new().serialize(state)
}

/// `#xmlid` pointer for an entity id, falling back to the id itself
fn pointer(xml_ids: &HashMap<&str, &str>, id: &str) -> String {
    format!("#{}", xml_ids.get(id).copied().unwrap_or(id))
}

struct OpenElement<'a> {
    tag: &'a Tag,
}

/// Rebuild inline markup for one passage from its tags
///
/// Tags are nested outer-first (start ascending, end descending). Two tags
/// whose ranges cross cannot be expressed as XML and are rejected, as are
/// kinds and attribute keys that are not valid names.
pub fn render_passage(passage: &Passage, xml_ids: &HashMap<&str, &str>) -> Result<String, SerializeError> {
    let len = passage.char_len();
    let mut ordered: Vec<(usize, &Tag)> = passage.tags.iter().enumerate().collect();
    ordered.sort_by_key(|(n, tag)| (tag.range.start, Reverse(tag.range.end), *n));

    let mut output = String::with_capacity(passage.content.len() * 2);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut cursor = 0;

    for (_, tag) in ordered {
        if tag.range.is_empty() || tag.range.end > len {
            return Err(SerializeError::RangeOutOfBounds {
                passage_id: passage.id.clone(),
                tag_id: tag.id.clone(),
                range: tag.range.to_string(),
            });
        }

        while let Some(top) = stack.last() {
            if top.tag.range.end > tag.range.start {
                break;
            }
            let end = top.tag.range.end;
            push_text(passage, cursor, end, &mut output);
            cursor = end;
            close_element(top.tag, &mut output);
            stack.pop();
        }

        if let Some(top) = stack.last() {
            if tag.range.end > top.tag.range.end {
                return Err(SerializeError::OverlappingTags {
                    passage_id: passage.id.clone(),
                    first: top.tag.id.clone(),
                    second: tag.id.clone(),
                });
            }
        }

        check_markup(&tag.kind, &tag.attributes).map_err(|source| SerializeError::InvalidMarkup {
            passage_id: passage.id.clone(),
            tag_id: tag.id.clone(),
            source,
        })?;

        push_text(passage, cursor, tag.range.start, &mut output);
        cursor = tag.range.start;
        open_element(tag, xml_ids, &mut output);
        stack.push(OpenElement { tag });
    }

    while let Some(top) = stack.pop() {
        let end = top.tag.range.end;
        push_text(passage, cursor, end, &mut output);
        cursor = end;
        close_element(top.tag, &mut output);
    }
    push_text(passage, cursor, len, &mut output);

    Ok(output)
}

fn push_text(passage: &Passage, start: usize, end: usize, output: &mut String) {
    if start >= end {
        return;
    }
    if let Some(text) = passage.slice(&TagRange::new(start, end)) {
        output.push_str(&partial_escape(text));
    }
}

fn open_element(tag: &Tag, xml_ids: &HashMap<&str, &str>, output: &mut String) {
    output.push('<');
    output.push_str(tag.kind.element_name());
    output.push_str(&format!(" xml:id=\"{}\"", escape(&tag.id)));

    for (name, value) in &tag.attributes {
        let value = if name == "who" {
            value
                .split_whitespace()
                .map(|speaker| pointer(xml_ids, speaker))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            value.clone()
        };
        output.push_str(&format!(" {}=\"{}\"", name, escape(&value)));
    }

    output.push('>');
}

fn close_element(tag: &Tag, output: &mut String) {
    output.push_str("</");
    output.push_str(tag.kind.element_name());
    output.push('>');
}
