use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed XML at {pos}: {message}")]
    Xml { pos: usize, message: String },

    #[error("Unexpected end tag </{found}> at {pos}: expected </{expected}>")]
    MismatchedEndTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Element <{name}> opened at {pos} is never closed")]
    UnclosedElement { pos: usize, name: String },

    #[error("Required element <{name}> is missing")]
    MissingElement { name: String },

    #[error("Invalid passage at {pos}: {message}")]
    InvalidPassage { pos: usize, message: String },
}

impl ParseError {
    pub fn xml(pos: usize, message: impl Into<String>) -> Self {
        Self::Xml {
            pos,
            message: message.into(),
        }
    }

    pub fn mismatched_end_tag(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedEndTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unclosed(pos: usize, name: impl Into<String>) -> Self {
        Self::UnclosedElement {
            pos,
            name: name.into(),
        }
    }

    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingElement { name: name.into() }
    }

    /// Byte offset into the source, when the error has one
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Xml { pos, .. }
            | ParseError::MismatchedEndTag { pos, .. }
            | ParseError::UnclosedElement { pos, .. }
            | ParseError::InvalidPassage { pos, .. } => Some(*pos),
            ParseError::MissingElement { .. } => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializeError {
    #[error("Tags {first} and {second} in passage {passage_id} cross each other and cannot be nested")]
    OverlappingTags {
        passage_id: String,
        first: String,
        second: String,
    },

    #[error("Tag {tag_id} in passage {passage_id} has range {range} outside the passage text")]
    RangeOutOfBounds {
        passage_id: String,
        tag_id: String,
        range: String,
    },

    #[error("Tag {tag_id} in passage {passage_id} cannot be written: {source}")]
    InvalidMarkup {
        passage_id: String,
        tag_id: String,
        source: MarkupError,
    },
}

/// A tag kind or attribute that cannot be written as inline XML
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("`{0}` is not an inline element name")]
    ElementName(String),

    #[error("`{0}` is not an attribute name")]
    AttributeName(String),

    #[error("attribute `{0}` is reserved")]
    ReservedAttribute(String),
}

impl MarkupError {
    /// Tag field the error is about
    pub fn field(&self) -> &'static str {
        match self {
            MarkupError::ElementName(_) => "kind",
            MarkupError::AttributeName(_) | MarkupError::ReservedAttribute(_) => "attributes",
        }
    }
}

/// Pretty-print a parse error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_parse_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let start = error
        .position()
        .unwrap_or(source.len())
        .min(source.len().saturating_sub(1));
    let end = (start + 1).min(source.len()).max(start);

    let label = match error {
        ParseError::Xml { message, .. } | ParseError::InvalidPassage { message, .. } => message.clone(),
        ParseError::MismatchedEndTag { expected, .. } => format!("expected </{}>", expected),
        ParseError::UnclosedElement { name, .. } => format!("<{}> opened here", name),
        ParseError::MissingElement { name } => format!("no <{}> element in document", name),
    };

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish();

    if report.write((filename, Source::from(source)), &mut output).is_err() {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}
