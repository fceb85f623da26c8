use super::{apply_mutations, read_document, read_mutations};
use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tei_editor::Event;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// TEI file to edit
    pub file: PathBuf,

    /// JSON array of mutations to apply in order
    #[arg(short, long)]
    pub mutations: PathBuf,

    /// Leave out the initial `loaded` snapshot
    #[arg(long)]
    pub skip_snapshot: bool,
}

pub fn history(args: HistoryArgs) -> Result<()> {
    let doc = read_document(&args.file)?;
    let edited = apply_mutations(&doc, read_mutations(&args.mutations)?)?;

    let stdout = std::io::stdout();
    write_events(edited.events.iter(), args.skip_snapshot, &mut stdout.lock())
}

/// One JSON object per line, oldest first
pub fn write_events<'a>(
    events: impl Iterator<Item = &'a Event>,
    skip_snapshot: bool,
    out: &mut impl Write,
) -> Result<()> {
    for event in events {
        if skip_snapshot && matches!(event, Event::Loaded { .. }) {
            continue;
        }
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
    }
    Ok(())
}
