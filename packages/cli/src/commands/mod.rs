pub mod apply;
pub mod check;
pub mod history;
pub mod inspect;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use history::{history, HistoryArgs};
pub use inspect::{inspect, InspectArgs};

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tei_editor::{mutations_from_json, Document, EditorError, Mutation};
use tei_parser::format_parse_error;
use tracing::debug;

/// Read and load a TEI file, rendering parse errors against the source
pub fn read_document(path: &Path) -> Result<Document> {
    let source = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!(path = %path.display(), bytes = source.len(), "read document");

    match Document::load(&source) {
        Ok(doc) => Ok(doc),
        Err(EditorError::Parse(err)) => {
            let filename = path.display().to_string();
            Err(anyhow!(
                "Failed to parse {}\n{}",
                filename,
                format_parse_error(&source, &filename, &err)
            ))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn read_mutations(path: &Path) -> Result<Vec<Mutation>> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    mutations_from_json(&json).with_context(|| format!("Invalid mutation script {}", path.display()))
}

/// Apply `mutations` in order, naming the failing step on error
pub fn apply_mutations(doc: &Document, mutations: Vec<Mutation>) -> Result<Document> {
    let mut current = doc.clone();
    for (step, mutation) in mutations.into_iter().enumerate() {
        current = current
            .apply(mutation)
            .with_context(|| format!("Mutation #{} failed", step + 1))?;
    }
    Ok(current)
}

/// First `max` chars of `text` on one line
pub fn excerpt(text: &str, max: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}
