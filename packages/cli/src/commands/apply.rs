use super::{apply_mutations, read_document, read_mutations};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// TEI file to edit
    pub file: PathBuf,

    /// JSON array of mutations to apply in order
    #[arg(short, long)]
    pub mutations: PathBuf,

    /// Output file (overrides config outDir; stdout when neither is set)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Move back to this revision before writing
    #[arg(long)]
    pub undo_to: Option<u64>,
}

pub fn apply(args: ApplyArgs, config: &Config, cwd: &str) -> Result<()> {
    let doc = read_document(&args.file)?;
    let mutations = read_mutations(&args.mutations)?;
    let count = mutations.len();

    let mut edited = apply_mutations(&doc, mutations)?;
    info!(applied = count, revision = edited.revision(), "mutations applied");

    if let Some(target) = args.undo_to {
        edited = edited
            .undo_to(target)
            .with_context(|| format!("Cannot undo to revision {}", target))?;
    }

    let xml = edited
        .serialize_with(config.serialize_options())
        .context("Edited document cannot be written as TEI")?;

    let out = args.out.clone().or_else(|| config.out_path(cwd, &args.file));
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, xml).with_context(|| format!("Failed to write {}", path.display()))?;

            println!(
                "{} Applied {} mutations (revision {} of {})",
                "✓".green(),
                count,
                edited.revision(),
                edited.latest_revision()
            );
            println!("  → {}", path.display());
        }
        None => print!("{}", xml),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::NOVEL;

    fn setup(script: &str) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("novel.xml");
        let mutations = dir.path().join("edits.json");
        fs::write(&file, NOVEL).unwrap();
        fs::write(&mutations, script).unwrap();
        (dir, file, mutations)
    }

    #[test]
    fn test_apply_writes_out_file() {
        let (dir, file, mutations) = setup(
            r#"[{"op": "addRelationship", "id": "rel-1", "from": "jdoe", "to": "jsmith", "kind": "spouse", "mutual": true}]"#,
        );
        let out = dir.path().join("edited.xml");

        apply(
            ApplyArgs {
                file,
                mutations,
                out: Some(out.clone()),
                undo_to: None,
            },
            &Config::default(),
            &dir.path().display().to_string(),
        )
        .unwrap();

        let written = fs::read_to_string(out).unwrap();
        assert!(written.contains(r##"<relation xml:id="rel-1" name="spouse""##));
        assert!(written.starts_with("<?xml"));
    }

    #[test]
    fn test_apply_uses_config_out_dir_and_undo() {
        let (dir, file, mutations) = setup(r#"[{"op": "removeCharacter", "characterId": "jsmith"}]"#);
        let config = Config {
            out_dir: Some("annotated".to_string()),
            xml_declaration: false,
            ..Config::default()
        };

        apply(
            ApplyArgs {
                file,
                mutations,
                out: None,
                undo_to: Some(0),
            },
            &config,
            &dir.path().display().to_string(),
        )
        .unwrap();

        let written = fs::read_to_string(dir.path().join("annotated").join("novel.xml")).unwrap();
        assert!(!written.starts_with("<?xml"));
        assert!(written.contains("Jane Smith"));
    }

    #[test]
    fn test_apply_rejects_bad_undo_target() {
        let (dir, file, mutations) = setup("[]");

        let err = apply(
            ApplyArgs {
                file,
                mutations,
                out: Some(dir.path().join("never.xml")),
                undo_to: Some(3),
            },
            &Config::default(),
            &dir.path().display().to_string(),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Cannot undo to revision 3");
        assert!(!dir.path().join("never.xml").exists());
    }
}
