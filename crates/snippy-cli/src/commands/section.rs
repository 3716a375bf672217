//! Section command implementation.

use crate::cli::{SectionAction, SectionArgs};
use crate::context::Context;
use crate::error::Result;

/// Execute the section command.
pub fn execute_section(args: SectionArgs, ctx: &Context) -> Result<()> {
    let mut archive = ctx.archive()?;

    match args.action {
        SectionAction::Add { project, title } => {
            let id = archive.add_section(project, &title)?;
            println!("{}", ctx.formatter.success(&format!("Added section {} ({})", title, id)));
        }
        SectionAction::Delete { id } => {
            archive.delete_section(id)?;
            println!("{}", ctx.formatter.success(&format!("Deleted section {}", id)));
        }
    }

    Ok(())
}
