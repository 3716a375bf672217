//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use snippy_domain::{EntityId, SortKey, TierSelector, TierThreshold};
use std::path::PathBuf;

/// Snippy - Collect journal articles and rank them by publication channel.
#[derive(Debug, Parser)]
#[command(name = "snippy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SNIPPY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the configured one)
    #[arg(long, global = true, env = "SNIPPY_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (one line per item)
    Quiet,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a search and rank the results
    Search(SearchArgs),

    /// Manage saved searches
    History(HistoryArgs),

    /// Manage projects
    Project(ProjectArgs),

    /// Manage project sections
    Section(SectionArgs),

    /// Manage search blocks inside sections
    Block(BlockArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Enter interactive REPL mode
    Repl,
}

/// Arguments for the search command.
#[derive(Debug, Clone, Parser)]
pub struct SearchArgs {
    /// Search keywords
    #[arg(required = true)]
    pub keywords: Vec<String>,

    /// Maximum number of records to collect
    #[arg(short, long, allow_negative_numbers = true)]
    pub max: Option<i64>,

    /// Qualifying tiers: 1_2_3, 2_3, 3 or custom:N
    #[arg(short, long)]
    pub threshold: Option<TierThreshold>,

    /// Publication years: all, 2015-2020 or 2015-
    #[arg(short, long)]
    pub years: Option<String>,

    /// Stop once this many qualified records are collected
    #[arg(long)]
    pub target: Option<usize>,

    /// Sort column: title, journal, year or tier
    #[arg(short, long)]
    pub sort: Option<SortKey>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Show only: all, qualified, unranked or a tier level
    #[arg(long, default_value = "all")]
    pub filter: TierSelector,

    /// Write the results to a CSV file
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Do not save the results to history
    #[arg(long)]
    pub no_save: bool,
}

impl SearchArgs {
    /// Keywords joined into one query string
    pub fn keyword_string(&self) -> String {
        self.keywords.join(" ")
    }
}

/// Display options shared by commands that print record tables.
#[derive(Debug, Clone, Parser)]
pub struct ViewArgs {
    /// Sort column: title, journal, year or tier
    #[arg(short, long)]
    pub sort: Option<SortKey>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Show only: all, qualified, unranked or a tier level
    #[arg(long, default_value = "all")]
    pub filter: TierSelector,

    /// Threshold used by the `qualified` filter
    #[arg(short, long, default_value = "2_3")]
    pub threshold: TierThreshold,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

/// History actions.
#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List saved searches, newest first
    List,

    /// Show the records of a saved search
    Show {
        /// Keywords of the saved search
        keywords: String,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Delete a saved search
    Delete {
        /// Keywords of the saved search
        keywords: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete one record from a saved search
    DeleteRecord {
        /// Keywords of the saved search
        keywords: String,

        /// Row number (as listed by `history show`) or record link
        record: String,
    },

    /// Delete records that do not satisfy a threshold
    Prune {
        /// Keywords of the saved search
        keywords: String,

        /// Tiers to keep: 1_2_3, 2_3, 3 or custom:N
        #[arg(short, long, default_value = "2_3")]
        threshold: TierThreshold,
    },

    /// Export a saved search to CSV
    Export {
        /// Keywords of the saved search
        keywords: String,

        /// Output file
        path: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
}

/// Arguments for the project command.
#[derive(Debug, Parser)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub action: ProjectAction,
}

/// Project actions.
#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    /// List projects
    List,

    /// Create a project
    Create {
        /// Project title
        title: String,

        /// Project description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show a project with its sections and blocks
    Show {
        /// Project id
        #[arg(value_parser = parse_id)]
        id: EntityId,
    },

    /// Delete a project and everything in it
    Delete {
        /// Project id
        #[arg(value_parser = parse_id)]
        id: EntityId,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the section command.
#[derive(Debug, Parser)]
pub struct SectionArgs {
    #[command(subcommand)]
    pub action: SectionAction,
}

/// Section actions.
#[derive(Debug, Subcommand)]
pub enum SectionAction {
    /// Add a section to a project
    Add {
        /// Project id
        #[arg(value_parser = parse_id)]
        project: EntityId,

        /// Section title
        title: String,
    },

    /// Delete a section
    Delete {
        /// Section id
        #[arg(value_parser = parse_id)]
        id: EntityId,
    },
}

/// Arguments for the block command.
#[derive(Debug, Parser)]
pub struct BlockArgs {
    #[command(subcommand)]
    pub action: BlockAction,
}

/// Search block actions.
#[derive(Debug, Subcommand)]
pub enum BlockAction {
    /// Copy a saved search into a section
    Add {
        /// Section id
        #[arg(value_parser = parse_id)]
        section: EntityId,

        /// Keywords of the saved search
        keywords: String,
    },

    /// Delete a search block
    Delete {
        /// Block id
        #[arg(value_parser = parse_id)]
        id: EntityId,
    },

    /// Delete one record from a search block
    DeleteRecord {
        /// Block id
        #[arg(value_parser = parse_id)]
        block: EntityId,

        /// Row number, starting at 1
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        row: u64,
    },
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

fn parse_id(s: &str) -> Result<EntityId, String> {
    EntityId::from_string(s)
}
