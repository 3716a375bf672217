//! History command implementation.

use crate::cli::{HistoryAction, HistoryArgs};
use crate::commands::search::export_rows;
use crate::commands::{confirm, view_from_args};
use crate::context::Context;
use crate::error::{CliError, Result};
use snippy_domain::{DedupKey, SavedSearch};

/// Execute the history command.
pub fn execute_history(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let formatter = &ctx.formatter;
    let mut archive = ctx.archive()?;

    match args.action {
        HistoryAction::List => {
            let searches = archive.list_searches()?;
            println!("{}", formatter.format_summaries(&searches)?);
        }
        HistoryAction::Show { keywords, view } => {
            let search = archive.get_search(&keywords)?;
            let view = view_from_args(&search.records, &view);
            println!("{}", formatter.format_records(&view.rows(&search.records))?);
        }
        HistoryAction::Delete { keywords, yes } => {
            if !yes && !confirm(&format!("Delete saved search \"{}\"?", keywords))? {
                println!("{}", formatter.info("Operation cancelled"));
                return Ok(());
            }
            archive.delete_search(&keywords)?;
            println!("{}", formatter.success(&format!("Deleted saved search \"{}\"", keywords)));
        }
        HistoryAction::DeleteRecord { keywords, record } => {
            let search = archive.get_search(&keywords)?;
            let key = resolve_record(&search, &record)?;
            archive.delete_record(&keywords, &key)?;
            println!("{}", formatter.success("Deleted 1 record"));
        }
        HistoryAction::Prune { keywords, threshold } => {
            let removed = archive.prune(&keywords, threshold)?;
            println!(
                "{}",
                formatter.success(&format!(
                    "Removed {} record(s) below {} from \"{}\"",
                    removed, threshold, keywords
                ))
            );
        }
        HistoryAction::Export { keywords, path, view } => {
            let search = archive.get_search(&keywords)?;
            let view = view_from_args(&search.records, &view);
            export_rows(&path, &view.rows(&search.records), formatter)?;
        }
    }

    Ok(())
}

/// Turn a row number (1-based, stored order) or a record link into a key.
pub fn resolve_record(search: &SavedSearch, record: &str) -> Result<DedupKey> {
    let record = record.trim();
    match record.parse::<usize>() {
        Ok(row) => row
            .checked_sub(1)
            .and_then(|i| search.records.get(i))
            .map(|r| r.dedup_key())
            .ok_or_else(|| {
                CliError::InvalidInput(format!(
                    "Row {} out of range (search has {} records)",
                    row,
                    search.records.len()
                ))
            }),
        Err(_) if record.is_empty() => Err(CliError::InvalidInput("Empty record reference".into())),
        Err(_) => Ok(DedupKey::parse(record)),
    }
}
