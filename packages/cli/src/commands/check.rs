use super::read_document;
use crate::config::Config;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tei_editor::{Document, DocumentState};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// TEI files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn check(args: CheckArgs, config: &Config) -> Result<()> {
    let mut failed = 0;

    for file in &args.files {
        let result = read_document(file).and_then(|doc| round_trip_differences(&doc, config));
        match result {
            Ok(differences) if differences.is_empty() => {
                println!("  {} {}", "✓".green(), file.display());
            }
            Ok(differences) => {
                failed += 1;
                println!("  {} {}", "✗".red(), file.display());
                for difference in differences {
                    println!("      {}", difference.red());
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("  {} {} - {}", "✗".red(), file.display(), e.to_string().red());
            }
        }
    }

    println!();
    if failed > 0 {
        bail!("{} of {} files do not survive a round trip", failed, args.files.len());
    }
    println!("{} {} files round-trip cleanly", "✅".green(), args.files.len());
    Ok(())
}

/// Write `doc` out, read it back and list what changed
pub fn round_trip_differences(doc: &Document, config: &Config) -> Result<Vec<String>> {
    let xml = doc
        .serialize_with(config.serialize_options())
        .context("Document cannot be written as TEI")?;
    let reloaded = Document::load(&xml).context("Written document cannot be read back")?;

    Ok(compare(&doc.state, &reloaded.state))
}

fn compare(before: &DocumentState, after: &DocumentState) -> Vec<String> {
    let mut differences = Vec::new();

    if before.metadata != after.metadata {
        differences.push("metadata changed".to_string());
    }
    if before.passages.len() != after.passages.len() {
        differences.push(format!(
            "passage count {} became {}",
            before.passages.len(),
            after.passages.len()
        ));
    }
    for (a, b) in before.passages.iter().zip(after.passages.iter()) {
        if a.id != b.id {
            differences.push(format!("passage {} came back as {}", a.id, b.id));
        } else if a.content != b.content {
            differences.push(format!("passage {} text changed", a.id));
        } else if a.tags != b.tags {
            differences.push(format!("passage {} tags changed", a.id));
        }
    }
    if before.characters != after.characters {
        differences.push("characters changed".to_string());
    }
    if before.relationships != after.relationships {
        differences.push("relationships changed".to_string());
    }
    if before.dialogue != after.dialogue {
        differences.push("dialogue changed".to_string());
    }

    differences
}
