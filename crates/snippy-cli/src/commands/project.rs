//! Project command implementation.

use crate::cli::{ProjectAction, ProjectArgs};
use crate::commands::confirm;
use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::Result;

/// Execute the project command.
pub fn execute_project(args: ProjectArgs, ctx: &Context) -> Result<()> {
    let formatter = &ctx.formatter;
    let mut archive = ctx.archive()?;

    match args.action {
        ProjectAction::List => {
            let projects = archive.list_projects()?;
            println!("{}", formatter.format_projects(&projects)?);
        }
        ProjectAction::Create { title, description } => {
            let id = archive.create_project(&title, &description)?;
            if formatter.format() == OutputFormat::Quiet {
                println!("{}", id);
            } else {
                println!("{}", formatter.success(&format!("Created project {} ({})", title, id)));
            }
        }
        ProjectAction::Show { id } => {
            let detail = archive.get_project(id)?;
            println!("{}", formatter.format_project_detail(&detail)?);
        }
        ProjectAction::Delete { id, yes } => {
            let detail = archive.get_project(id)?;
            let question = format!(
                "Delete project \"{}\" with {} section(s)?",
                detail.project.title,
                detail.sections.len()
            );
            if !yes && !confirm(&question)? {
                println!("{}", formatter.info("Operation cancelled"));
                return Ok(());
            }
            archive.delete_project(id)?;
            println!("{}", formatter.success(&format!("Deleted project {}", id)));
        }
    }

    Ok(())
}
