//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use serde_json::json;
use snippy_domain::{Highlight, Project, ProjectDetail, Record, SearchSummary, Tier};
use snippy_engine::RunOutcome;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const TITLE_WIDTH: usize = 60;
const JOURNAL_WIDTH: usize = 40;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format result rows.
    pub fn format_records(&self, records: &[&Record]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_records_json(records),
            OutputFormat::Table => Ok(self.format_records_table(records)),
            OutputFormat::Quiet => Ok(self.format_records_quiet(records)),
        }
    }

    fn format_records_json(&self, records: &[&Record]) -> Result<String> {
        let rows: Vec<serde_json::Value> = records.iter().map(|r| record_json(r)).collect();

        Ok(serde_json::to_string_pretty(&rows)?)
    }

    fn format_records_table(&self, records: &[&Record]) -> String {
        if records.is_empty() {
            return self.colorize("No records found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Title", "Journal", "Year", "Tier", "Link"]);

        for (i, record) in records.iter().enumerate() {
            builder.push_record([
                (i + 1).to_string(),
                truncate(&record.title, TITLE_WIDTH),
                truncate(&record.journal, JOURNAL_WIDTH),
                record.year_display(),
                record.tier.as_str().to_string(),
                record.link_or_placeholder().to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let tiers: Vec<Tier> = records.iter().map(|r| r.tier).collect();
        self.highlight_rows(&table.to_string(), &tiers)
    }

    /// Colors each data line of a rounded table by its record's tier.
    ///
    /// Rounded tables draw a border, the header, and a separator before the
    /// first data line, and cells are single-line.
    fn highlight_rows(&self, table: &str, tiers: &[Tier]) -> String {
        if !self.color_enabled {
            return table.to_string();
        }

        table
            .lines()
            .enumerate()
            .map(|(i, line)| match i.checked_sub(3).and_then(|row| tiers.get(row)) {
                Some(tier) => self.tier_colored(line, *tier),
                None => line.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_records_quiet(&self, records: &[&Record]) -> String {
        records
            .iter()
            .map(|r| r.link.clone().unwrap_or_else(|| r.title.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Format the saved search listing.
    pub fn format_summaries(&self, searches: &[SearchSummary]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = searches
                    .iter()
                    .map(|s| json!({ "keywords": s.keywords, "saved_at": s.saved_at, "count": s.count }))
                    .collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            OutputFormat::Quiet => Ok(searches
                .iter()
                .map(|s| s.keywords.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if searches.is_empty() {
                    return Ok(self.colorize("No saved searches.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Keywords", "Saved", "Records"]);
                for search in searches {
                    builder.push_record([
                        search.keywords.clone(),
                        search.saved_at.to_string(),
                        search.count.to_string(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format the project listing.
    pub fn format_projects(&self, projects: &[Project]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<serde_json::Value> = projects.iter().map(project_json).collect();
                Ok(serde_json::to_string_pretty(&rows)?)
            }
            OutputFormat::Quiet => Ok(projects
                .iter()
                .map(|p| p.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if projects.is_empty() {
                    return Ok(self.colorize("No projects.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Title", "Description", "Created"]);
                for project in projects {
                    builder.push_record([
                        project.id.to_string(),
                        project.title.clone(),
                        truncate(&project.description, JOURNAL_WIDTH),
                        project.created_at.to_string(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a project tree.
    pub fn format_project_detail(&self, detail: &ProjectDetail) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut value = project_json(&detail.project);
                value["sections"] = detail
                    .sections
                    .iter()
                    .map(|s| {
                        json!({
                            "id": s.section.id.to_string(),
                            "title": s.section.title,
                            "created_at": s.section.created_at,
                            "blocks": s.blocks.iter().map(|b| json!({
                                "id": b.id.to_string(),
                                "keywords": b.keywords,
                                "added_at": b.added_at,
                                "records": b.records.iter().map(record_json).collect::<Vec<_>>(),
                            })).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => {
                let mut ids = Vec::new();
                for section in &detail.sections {
                    ids.push(section.section.id.to_string());
                    ids.extend(section.blocks.iter().map(|b| b.id.to_string()));
                }
                Ok(ids.join("\n"))
            }
            OutputFormat::Table => {
                let mut out = vec![
                    self.colorize(&detail.project.title, "cyan"),
                    format!("ID: {}", detail.project.id),
                ];
                if !detail.project.description.is_empty() {
                    out.push(detail.project.description.clone());
                }
                if detail.sections.is_empty() {
                    out.push(self.colorize("No sections.", "yellow"));
                }
                for section in &detail.sections {
                    out.push(String::new());
                    out.push(format!(
                        "{} ({})",
                        self.colorize(&section.section.title, "magenta"),
                        section.section.id
                    ));
                    for block in &section.blocks {
                        out.push(format!(
                            "  Block {} - \"{}\" ({} records)",
                            block.id, block.keywords, block.records.len()
                        ));
                        let rows: Vec<&Record> = block.records.iter().collect();
                        if !rows.is_empty() {
                            out.push(self.format_records_table(&rows));
                        }
                    }
                }
                Ok(out.join("\n"))
            }
        }
    }

    /// Format the end-of-run report.
    pub fn format_outcome(&self, outcome: &RunOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = json!({
                    "keywords": outcome.query.keywords(),
                    "status": outcome.status().as_str(),
                    "cumulative": outcome.state.cumulative_count,
                    "qualified": outcome.state.qualified_count,
                    "max_results": outcome.query.max_results(),
                    "threshold": outcome.query.tier_threshold().as_string(),
                    "last_error": outcome.state.last_error,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(format!(
                "{} {}/{}",
                outcome.status(),
                outcome.state.qualified_count,
                outcome.state.cumulative_count
            )),
            OutputFormat::Table => Ok(outcome.summary()),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Render text in the color class of a tier.
    pub fn tier_colored(&self, text: &str, tier: Tier) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match tier.highlight() {
            Highlight::Strong => text.green().bold().to_string(),
            Highlight::Medium => text.cyan().to_string(),
            Highlight::Weak => text.yellow().to_string(),
            Highlight::None => text.to_string(),
        }
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

fn record_json(record: &Record) -> serde_json::Value {
    json!({
        "title": record.title,
        "journal": record.journal,
        "year": record.year,
        "tier": record.tier.as_str(),
        "link": record.link,
        "author": record.author,
        "citation": record.citation(),
    })
}

fn project_json(project: &Project) -> serde_json::Value {
    json!({
        "id": project.id.to_string(),
        "title": project.title,
        "description": project.description,
        "created_at": project.created_at,
    })
}

/// Single-line cell text, cut to `max` characters.
fn truncate(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
