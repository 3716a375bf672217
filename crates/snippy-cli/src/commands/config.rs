//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::Result;
use std::path::Path;

/// Execute the config command.
///
/// `config_path` is the file the configuration was loaded from.
pub fn execute_config(args: ConfigArgs, ctx: &Context, config_path: &Path) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let rendered = match ctx.formatter.format() {
                OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                    "config_path": config_path.display().to_string(),
                    "database_path": ctx.db_path().display().to_string(),
                    "config": serde_json::to_value(&ctx.config)?,
                }))?,
                _ => {
                    let mut out = format!(
                        "# {}\n# database: {}\n\n",
                        config_path.display(),
                        ctx.db_path().display()
                    );
                    out.push_str(&toml::to_string_pretty(&ctx.config)?);
                    out
                }
            };
            println!("{}", rendered);
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
