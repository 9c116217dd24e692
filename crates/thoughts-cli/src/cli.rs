use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use thoughts_core::models::{InputMode, SyncMode};

#[derive(Parser)]
#[command(name = "thoughts")]
#[command(about = "Capture thoughts and sync them to daily markdown notes on GitHub")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick capture: thoughts "my thought here"
    #[arg(trailing_var_arg = true)]
    pub thought: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a new thought
    #[command(alias = "new")]
    Add {
        /// Thought text (read from stdin or an editor when omitted)
        text: Vec<String>,
        /// Capture latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Capture longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// List recent thoughts
    List {
        /// Number of thoughts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Only show thoughts not yet synced
        #[arg(long)]
        unsynced: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export thoughts
    Export {
        /// Only export today's thoughts
        #[arg(long)]
        today: bool,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
        /// Output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Pull today's remote file and push unsynced thoughts
    Sync {
        /// Only pull
        #[arg(long, conflicts_with = "push")]
        pull: bool,
        /// Only push
        #[arg(long)]
        push: bool,
    },
    /// Show sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure sync and input settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage feature flags
    Flags {
        #[command(subcommand)]
        command: FlagsCommands,
    },
    /// Location name lookups
    Geocode {
        #[command(subcommand)]
        command: GeocodeCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncModeArg {
    Auto,
    Manual,
}

impl From<SyncModeArg> for SyncMode {
    fn from(value: SyncModeArg) -> Self {
        match value {
            SyncModeArg::Auto => Self::Auto,
            SyncModeArg::Manual => Self::Manual,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum InputModeArg {
    Single,
    Multiline,
}

impl From<InputModeArg> for InputMode {
    fn from(value: InputModeArg) -> Self {
        match value {
            InputModeArg::Single => Self::Single,
            InputModeArg::Multiline => Self::Multiline,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set GitHub sync settings; omitted values keep their current setting
    Sync {
        /// GitHub token with contents write access (or THOUGHTS_GITHUB_TOKEN)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
        /// Repository in owner/name form
        #[arg(long, value_name = "OWNER/NAME")]
        repo: Option<String>,
        /// File path template containing {date}
        #[arg(long, value_name = "TEMPLATE")]
        path: Option<String>,
        /// Branch to commit to
        #[arg(long, value_name = "BRANCH")]
        branch: Option<String>,
        /// When to sync
        #[arg(long, value_enum)]
        mode: Option<SyncModeArg>,
    },
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove sync settings (disables sync)
    Clear,
    /// Set how text is read when no thought is given on the command line
    InputMode {
        #[arg(value_enum)]
        mode: InputModeArg,
    },
}

#[derive(Subcommand)]
pub enum FlagsCommands {
    /// List features and their state
    List,
    /// Enable an experimental feature
    Enable { feature: String },
    /// Disable an experimental feature
    Disable { feature: String },
    /// Turn experimental mode on
    Experimental,
    /// Turn experimental mode off and disable every experimental feature
    Stable,
    /// Apply a flag spec: off, experimental, all, or a comma-separated list
    Apply { spec: String },
}

#[derive(Subcommand)]
pub enum GeocodeCommands {
    /// Look up the place name for coordinates (cached)
    Lookup {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Forget every cached place name
    ClearCache,
}
