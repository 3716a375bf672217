//! Snippy CLI - Collect journal articles and rank them by publication channel.

use clap::Parser;
use snippy_cli::commands;
use snippy_cli::repl;
use snippy_cli::{Cli, Command, Config, Context, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so tables and JSON on stdout stay clean
    let filter = EnvFilter::try_from_env("SNIPPY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> snippy_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load or create config
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::path()?,
    };
    let config = Config::load(Some(config_path.as_path()))?;

    let db_path = match cli.db {
        Some(path) => path,
        None => config.database_path()?,
    };

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;
    if !color_enabled {
        colored::control::set_override(false);
    }

    let formatter = Formatter::new(format, color_enabled);
    let mut ctx = Context::new(config, formatter, db_path);

    // Handle commands
    match cli.command {
        None | Some(Command::Repl) => {
            repl::run_repl(&mut ctx, &config_path).await?;
        }
        Some(Command::Search(args)) => {
            commands::execute_search(args, &mut ctx).await?;
        }
        Some(Command::History(args)) => commands::execute_history(args, &ctx)?,
        Some(Command::Project(args)) => commands::execute_project(args, &ctx)?,
        Some(Command::Section(args)) => commands::execute_section(args, &ctx)?,
        Some(Command::Block(args)) => commands::execute_block(args, &ctx)?,
        Some(Command::Config(args)) => commands::execute_config(args, &ctx, &config_path)?,
    }

    Ok(())
}
