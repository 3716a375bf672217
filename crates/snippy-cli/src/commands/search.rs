//! Search command implementation.

use crate::cli::SearchArgs;
use crate::commands::build_view;
use crate::config::OutputFormat;
use crate::context::Context;
use crate::error::Result;
use crate::output::Formatter;
use indicatif::{ProgressBar, ProgressStyle};
use snippy_domain::{PageFetcher, Query, RankingClassifier, Record};
use snippy_engine::{export_csv, RunEvent, RunOutcome, RunStatus, SessionController};

/// Execute the search command.
///
/// Returns the outcome so the REPL can keep working with the results.
pub async fn execute_search(args: SearchArgs, ctx: &mut Context) -> Result<RunOutcome> {
    let query = ctx.config.build_query(
        &args.keyword_string(),
        args.max,
        args.threshold,
        args.years.as_deref(),
        args.target,
    )?;

    let session = ctx.session()?;
    let outcome = run_search(&session, query, &ctx.formatter).await?;

    let view = build_view(
        &outcome.records,
        outcome.query.tier_threshold(),
        args.sort,
        args.desc,
        args.filter,
    );
    let rows = view.rows(&outcome.records);
    println!("{}", ctx.formatter.format_records(&rows)?);
    report_outcome(&outcome, &ctx.formatter)?;

    if let Some(path) = &args.export {
        export_rows(path, &rows, &ctx.formatter)?;
    }

    if !args.no_save {
        save_outcome(&outcome, ctx)?;
    }

    Ok(outcome)
}

/// Start a run and render its progress until it finishes.
///
/// Ctrl+C asks the run to stop after the page being fetched.
pub async fn run_search<F, C>(
    session: &SessionController<F, C>,
    query: Query,
    formatter: &Formatter,
) -> Result<RunOutcome>
where
    F: PageFetcher + 'static,
    C: RankingClassifier + 'static,
{
    let mut handle = session.start_run(query.clone())?;
    let cancel = handle.cancel_flag();
    let bar = progress_bar(query.max_results(), formatter.format());
    bar.set_message(format!("qualified 0 ({})", query.tier_threshold()));

    let mut cancelling = false;
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(RunEvent::Progress(snapshot)) => {
                    bar.set_position(snapshot.cumulative as u64);
                    if !cancelling {
                        bar.set_message(format!(
                            "qualified {} ({})",
                            snapshot.qualified,
                            query.tier_threshold()
                        ));
                    }
                }
                Some(RunEvent::Finished { status, .. }) => {
                    tracing::debug!(status = %status, "Run finished");
                    bar.finish_and_clear();
                    break;
                }
                None => {
                    bar.finish_and_clear();
                    break;
                }
            },
            Ok(()) = tokio::signal::ctrl_c(), if !cancelling => {
                cancelling = true;
                cancel.request();
                bar.set_message("stopping after the current page");
            }
        }
    }

    Ok(handle.finish().await?)
}

fn progress_bar(max_results: usize, format: OutputFormat) -> ProgressBar {
    if format != OutputFormat::Table {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(max_results as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} records | {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Print the run summary, with a warning for failed runs.
pub fn report_outcome(outcome: &RunOutcome, formatter: &Formatter) -> Result<()> {
    let report = formatter.format_outcome(outcome)?;
    if formatter.format() == OutputFormat::Json {
        eprintln!("{}", report);
    } else {
        println!("{}", report);
    }

    if outcome.status() == RunStatus::Failed {
        eprintln!(
            "{}",
            formatter.warning("Search stopped on a provider error; showing partial results")
        );
    }
    Ok(())
}

/// Write rows to CSV and report the count.
pub fn export_rows(path: &std::path::Path, rows: &[&Record], formatter: &Formatter) -> Result<()> {
    let written = export_csv(path, rows)?;
    eprintln!(
        "{}",
        formatter.success(&format!("Exported {} record(s) to {}", written, path.display()))
    );
    Ok(())
}

fn save_outcome(outcome: &RunOutcome, ctx: &Context) -> Result<()> {
    let mut archive = ctx.archive()?;
    if archive.save_outcome(outcome)? {
        eprintln!(
            "{}",
            ctx.formatter
                .success(&format!("Saved search \"{}\"", outcome.query.keywords()))
        );
    }
    Ok(())
}
