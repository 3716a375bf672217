//! Search block command implementation.

use crate::cli::{BlockAction, BlockArgs};
use crate::context::Context;
use crate::error::{CliError, Result};

/// Execute the block command.
pub fn execute_block(args: BlockArgs, ctx: &Context) -> Result<()> {
    let mut archive = ctx.archive()?;

    match args.action {
        BlockAction::Add { section, keywords } => {
            let id = archive.add_search_block(section, &keywords)?;
            println!(
                "{}",
                ctx.formatter
                    .success(&format!("Copied \"{}\" into block {}", keywords, id))
            );
        }
        BlockAction::Delete { id } => {
            archive.delete_search_block(id)?;
            println!("{}", ctx.formatter.success(&format!("Deleted block {}", id)));
        }
        BlockAction::DeleteRecord { block, row } => {
            let index = row_index(row)?;
            archive.delete_block_record(block, index)?;
            println!(
                "{}",
                ctx.formatter
                    .success(&format!("Deleted row {} from block {}", row, block))
            );
        }
    }

    Ok(())
}

/// Zero-based index for a 1-based row number.
fn row_index(row: u64) -> Result<usize> {
    row.checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| CliError::InvalidInput(format!("Invalid row number: {}", row)))
}
