//! Interactive REPL (Read-Eval-Print Loop) mode.
//!
//! Besides the regular commands, the REPL keeps the last result set around
//! so it can be re-sorted, filtered and exported without searching again.

use crate::cli::Command;
use crate::commands;
use crate::config::Config;
use crate::context::Context;
use crate::error::{CliError, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use snippy_domain::{Record, ResultView, SortDirection, SortKey, TierSelector};
use std::path::{Path, PathBuf};

/// Regular commands typed at the prompt.
#[derive(Debug, Parser)]
#[command(name = "snippy", no_binary_name = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

/// Records shown by `show`, `sort`, `filter` and `export`.
struct Current {
    keywords: String,
    records: Vec<Record>,
    view: ResultView,
}

impl Current {
    fn new(keywords: String, records: Vec<Record>, view: ResultView) -> Self {
        Self {
            keywords,
            records,
            view,
        }
    }
}

/// REPL command type.
#[derive(Debug)]
enum ReplCommand {
    Exit,
    Help,
    Show,
    Sort(SortKey),
    Filter(TierSelector),
    Reset,
    Export(PathBuf),
    Open(String),
    Command(Command),
}

/// Run the interactive REPL.
pub async fn run_repl(ctx: &mut Context, config_path: &Path) -> Result<()> {
    println!(
        "{}",
        ctx.formatter
            .info("Snippy REPL - Type 'help' for commands, 'exit' to quit")
    );
    println!();

    let editor_config = rustyline::Config::builder()
        .max_history_size(ctx.config.settings.history_size)?
        .auto_add_history(false)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;

    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    let mut current: Option<Current> = None;

    loop {
        let prompt = match &current {
            Some(c) => format!("snippy [{}]> ", c.keywords),
            None => "snippy> ".to_string(),
        };

        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                editor.add_history_entry(line).ok();

                match parse_repl_command(line) {
                    Ok(ReplCommand::Exit) => {
                        println!("{}", ctx.formatter.info("Goodbye!"));
                        break;
                    }
                    Ok(ReplCommand::Help) => {
                        print_help(ctx);
                    }
                    Ok(cmd) => {
                        if let Err(e) = execute_repl_command(cmd, &mut current, ctx, config_path).await {
                            eprintln!("{}", ctx.formatter.error(&e.to_string()));
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", ctx.formatter.error(&e.to_string()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", ctx.formatter.info("Use 'exit' to quit"));
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("{}", ctx.formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();

    Ok(())
}

/// Parse a REPL command line.
fn parse_repl_command(line: &str) -> Result<ReplCommand> {
    let parts = split_args(line)?;
    let Some(first) = parts.first() else {
        return Err(CliError::InvalidInput("Empty command".to_string()));
    };
    let rest = &parts[1..];

    match first.as_str() {
        "exit" | "quit" | "q" => Ok(ReplCommand::Exit),
        "help" | "?" => Ok(ReplCommand::Help),
        "show" => Ok(ReplCommand::Show),
        "reset" => Ok(ReplCommand::Reset),
        "sort" => {
            let column = single_arg(rest, "sort <title|journal|year|tier>")?;
            SortKey::parse(column)
                .map(ReplCommand::Sort)
                .ok_or_else(|| CliError::InvalidInput(format!("Unknown sort column: {}", column)))
        }
        "filter" => {
            let selector = single_arg(rest, "filter <all|qualified|unranked|1|2|3>")?;
            TierSelector::parse(selector)
                .map(ReplCommand::Filter)
                .map_err(CliError::InvalidInput)
        }
        "export" => {
            let path = single_arg(rest, "export <file.csv>")?;
            Ok(ReplCommand::Export(PathBuf::from(path)))
        }
        "open" => {
            if rest.is_empty() {
                return Err(CliError::InvalidInput("Usage: open <keywords>".to_string()));
            }
            Ok(ReplCommand::Open(rest.join(" ")))
        }
        _ => ReplLine::try_parse_from(&parts)
            .map(|l| ReplCommand::Command(l.command))
            .map_err(|e| CliError::InvalidInput(e.to_string().trim_end().to_string())),
    }
}

fn single_arg<'a>(args: &'a [String], usage: &str) -> Result<&'a str> {
    match args {
        [only] => Ok(only.as_str()),
        _ => Err(CliError::InvalidInput(format!("Usage: {}", usage))),
    }
}

/// Split a line on whitespace, keeping double-quoted runs together.
fn split_args(line: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut token = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    parts.push(std::mem::take(&mut token));
                    has_token = false;
                }
            }
            c => {
                token.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(CliError::InvalidInput("Unterminated quote".to_string()));
    }
    if has_token {
        parts.push(token);
    }
    Ok(parts)
}

/// Execute a REPL command.
async fn execute_repl_command(
    cmd: ReplCommand,
    current: &mut Option<Current>,
    ctx: &mut Context,
    config_path: &Path,
) -> Result<()> {
    match cmd {
        ReplCommand::Command(Command::Search(args)) => {
            let outcome = commands::execute_search(args.clone(), ctx).await?;
            let view = commands::build_view(
                &outcome.records,
                outcome.query.tier_threshold(),
                args.sort,
                args.desc,
                args.filter,
            );
            let keywords = outcome.query.keywords().to_string();
            *current = Some(Current::new(keywords, outcome.records, view));
        }
        ReplCommand::Command(Command::History(args)) => commands::execute_history(args, ctx)?,
        ReplCommand::Command(Command::Project(args)) => commands::execute_project(args, ctx)?,
        ReplCommand::Command(Command::Section(args)) => commands::execute_section(args, ctx)?,
        ReplCommand::Command(Command::Block(args)) => commands::execute_block(args, ctx)?,
        ReplCommand::Command(Command::Config(args)) => {
            commands::execute_config(args, ctx, config_path)?
        }
        ReplCommand::Command(Command::Repl) => {
            println!("{}", ctx.formatter.info("Already in REPL mode"));
        }
        ReplCommand::Open(keywords) => {
            let search = ctx.archive()?.get_search(&keywords)?;
            let threshold = ctx.config.default_threshold().unwrap_or_default();
            let view = ResultView::ranked(&search.records, threshold);
            let loaded = Current::new(search.keywords, search.records, view);
            print_current(&loaded, ctx)?;
            *current = Some(loaded);
        }
        ReplCommand::Show => print_current(require(current)?, ctx)?,
        ReplCommand::Sort(key) => {
            let c = require_mut(current)?;
            let state = c.view.sort_by(&c.records, key);
            let direction = match state.direction {
                SortDirection::Ascending => "ascending",
                SortDirection::Descending => "descending",
            };
            print_current(c, ctx)?;
            println!("{}", ctx.formatter.info(&format!("Sorted by {} ({})", key, direction)));
        }
        ReplCommand::Filter(selector) => {
            let c = require_mut(current)?;
            c.view.set_filter(selector);
            print_current(c, ctx)?;
        }
        ReplCommand::Reset => {
            let c = require_mut(current)?;
            c.view.rank(&c.records);
            c.view.set_filter(TierSelector::All);
            print_current(c, ctx)?;
        }
        ReplCommand::Export(path) => {
            let c = require(current)?;
            commands::search::export_rows(&path, &c.view.rows(&c.records), &ctx.formatter)?;
        }
        ReplCommand::Exit | ReplCommand::Help => {}
    }

    Ok(())
}

fn require(current: &Option<Current>) -> Result<&Current> {
    current
        .as_ref()
        .ok_or_else(|| CliError::InvalidInput("No results yet. Run 'search' or 'open' first.".to_string()))
}

fn require_mut(current: &mut Option<Current>) -> Result<&mut Current> {
    current
        .as_mut()
        .ok_or_else(|| CliError::InvalidInput("No results yet. Run 'search' or 'open' first.".to_string()))
}

fn print_current(current: &Current, ctx: &Context) -> Result<()> {
    let rows = current.view.rows(&current.records);
    println!("{}", ctx.formatter.format_records(&rows)?);
    println!(
        "{}",
        ctx.formatter.info(&format!(
            "{} of {} record(s), filter: {}",
            rows.len(),
            current.records.len(),
            current.view.filter()
        ))
    );
    Ok(())
}

fn get_history_path() -> Result<PathBuf> {
    let dir = Config::home_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

fn print_help(ctx: &Context) {
    println!("{}", ctx.formatter.info("Available commands:"));
    println!();
    println!("  search <keywords...> [options]  - Run a search (see 'search --help')");
    println!("  show                            - Show the current results");
    println!("  sort <title|journal|year|tier>  - Sort; repeat to toggle direction");
    println!("  filter <all|qualified|unranked|1|2|3>");
    println!("                                  - Filter the current results");
    println!("  reset                           - Back to ranked order, no filter");
    println!("  export <file.csv>               - Export the current view");
    println!("  open <keywords>                 - Load a saved search");
    println!("  history <list|show|delete|delete-record|prune|export>");
    println!("  project <list|create|show|delete>");
    println!("  section <add|delete>");
    println!("  block <add|delete|delete-record>");
    println!("  config <show|path>");
    println!("  help, ?                         - Show this help");
    println!("  exit, quit, q                   - Exit REPL");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{HistoryAction, HistoryArgs};

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("show").unwrap(), vec!["show"]);
        assert_eq!(
            split_args("history show \"graph theory\" --sort year").unwrap(),
            vec!["history", "show", "graph theory", "--sort", "year"]
        );
        assert_eq!(split_args("open \"\"").unwrap(), vec!["open", ""]);
        assert!(split_args("open \"graph").is_err());
    }

    #[test]
    fn test_parse_view_commands() {
        assert!(matches!(parse_repl_command("sort year").unwrap(), ReplCommand::Sort(SortKey::Year)));
        assert!(matches!(
            parse_repl_command("filter qualified").unwrap(),
            ReplCommand::Filter(TierSelector::AnyQualified)
        ));
        assert!(matches!(parse_repl_command("q").unwrap(), ReplCommand::Exit));
        assert!(parse_repl_command("sort colour").is_err());
        assert!(parse_repl_command("sort").is_err());
        assert!(parse_repl_command("export").is_err());
    }

    #[test]
    fn test_parse_open_joins_keywords() {
        match parse_repl_command("open graph theory").unwrap() {
            ReplCommand::Open(keywords) => assert_eq!(keywords, "graph theory"),
            other => panic!("Expected Open, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_regular_commands() {
        match parse_repl_command("search graph theory --max 25").unwrap() {
            ReplCommand::Command(Command::Search(args)) => {
                assert_eq!(args.keyword_string(), "graph theory");
                assert_eq!(args.max, Some(25));
            }
            other => panic!("Expected Search, got {:?}", other),
        }

        match parse_repl_command("history delete \"graph theory\" -y").unwrap() {
            ReplCommand::Command(Command::History(HistoryArgs {
                action: HistoryAction::Delete { keywords, yes },
            })) => {
                assert_eq!(keywords, "graph theory");
                assert!(yes);
            }
            other => panic!("Expected History Delete, got {:?}", other),
        }

        assert!(parse_repl_command("frobnicate").is_err());
    }

    #[test]
    fn test_view_commands_need_results() {
        let mut current = None;
        assert!(require(&current).is_err());
        assert!(require_mut(&mut current).is_err());
    }
}
