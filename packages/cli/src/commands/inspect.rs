use super::{excerpt, read_document};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tei_editor::DocumentState;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// TEI file to inspect
    pub file: PathBuf,

    /// Print every passage instead of the first few
    #[arg(short, long)]
    pub all: bool,
}

const PREVIEW_PASSAGES: usize = 5;

pub fn inspect(args: InspectArgs) -> Result<()> {
    let doc = read_document(&args.file)?;
    let state = &doc.state;

    println!("{}", state.metadata.title.bright_white().bold());
    if !state.metadata.author.is_empty() {
        println!("by {}", state.metadata.author);
    }
    println!();

    println!(
        "{} passages, {} tags, {} characters, {} relationships",
        state.passages.len(),
        state.tag_count(),
        state.characters.len(),
        state.relationships.len()
    );
    println!();

    println!("{}", "Passages".bright_blue().bold());
    let shown = if args.all { state.passages.len() } else { PREVIEW_PASSAGES };
    for passage in state.passages.iter().take(shown) {
        println!(
            "  {} {} {}",
            passage.id.dimmed(),
            format!("[{} tags]", passage.tags.len()).cyan(),
            excerpt(&passage.content, 60)
        );
    }
    if state.passages.len() > shown {
        println!("  {}", format!("… {} more", state.passages.len() - shown).dimmed());
    }

    if !state.characters.is_empty() {
        println!();
        println!("{}", "Characters".bright_blue().bold());
        let lines = dialogue_counts(state);
        for character in state.characters.iter() {
            let sex = character.sex.as_deref().map(|s| format!(" ({})", s)).unwrap_or_default();
            let spoken = lines.get(character.id.as_str()).copied().unwrap_or(0);
            println!(
                "  {} {}{} {}",
                "•".green(),
                character.name,
                sex,
                format!("#{} · {} lines", character.xml_id, spoken).dimmed()
            );
        }
    }

    if !state.relationships.is_empty() {
        println!();
        println!("{}", "Relationships".bright_blue().bold());
        for relationship in state.relationships.iter() {
            let arrow = if relationship.mutual { "<->" } else { "->" };
            println!(
                "  {} {} {} ({})",
                relationship.from, arrow, relationship.to, relationship.kind
            );
        }
    }

    let unattributed: Vec<_> = state
        .dialogue
        .iter()
        .filter(|entry| state.character(&entry.speaker).is_none())
        .collect();
    if !unattributed.is_empty() {
        println!();
        println!(
            "{} {} dialogue entries name an unknown speaker",
            "⚠️".yellow(),
            unattributed.len()
        );
    }

    Ok(())
}

/// Dialogue entries per speaker id
pub fn dialogue_counts(state: &DocumentState) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for entry in state.dialogue.iter() {
        *counts.entry(entry.speaker.as_str()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::NOVEL;

    #[test]
    fn test_dialogue_counts() {
        let doc = tei_editor::Document::load(NOVEL).unwrap();
        let counts = dialogue_counts(&doc.state);
        assert_eq!(counts.get("jdoe"), Some(&1));
        assert_eq!(counts.get("jsmith"), None);
    }

    #[test]
    fn test_inspect_runs_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("novel.xml");
        std::fs::write(&path, NOVEL).unwrap();

        assert!(inspect(InspectArgs { file: path, all: true }).is_ok());
    }
}
