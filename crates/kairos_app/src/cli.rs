use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kairos_core::SourceKind;

use crate::config::DEFAULT_CONFIG_FILE;

/// Command-line client for a Kairos notebook service.
#[derive(Parser)]
#[command(name = "kairos", version, about)]
pub struct Cli {
    /// Settings file (RON).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Service base url; overrides the settings file.
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Notebook id; defaults to the last notebook used.
    #[arg(short, long, global = true)]
    pub notebook: Option<String>,

    /// Job status poll interval in milliseconds.
    #[arg(long, global = true)]
    pub poll_ms: Option<u64>,

    /// Give up on a job after this many seconds.
    #[arg(long, global = true)]
    pub max_wait_secs: Option<u64>,

    /// Also log to the terminal, at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a notebook and make it current.
    Create {
        #[arg(long)]
        name: Option<String>,
        /// Where the service should store it.
        #[arg(long)]
        path: Option<String>,
    },
    /// Load a notebook file on the service host and make it current.
    Load {
        /// Path on the service host; omit to use the native file picker there.
        path: Option<String>,
    },
    /// Print the notebook overview.
    Show,
    Rename { name: String },
    /// Ask the notebook agent.
    Run { prompt: String },
    /// Generate text and append it to the document.
    Generate {
        prompt: String,
        /// Save the document afterwards.
        #[arg(long)]
        save: bool,
    },
    /// Rewrite a passage of the document.
    Edit {
        /// Exact text to replace.
        #[arg(long)]
        selection: String,
        prompt: String,
        #[arg(long)]
        save: bool,
    },
    Chat { prompt: String },
    /// Suggest writing ideas for the current document.
    Ideas,
    /// Ingest a source document.
    AddSource {
        #[arg(value_parser = parse_source_kind)]
        kind: SourceKind,
        /// File path, url or video link.
        origin: String,
    },
    /// Summarize a source.
    Summary {
        source_id: String,
        /// Only the last K chunks.
        #[arg(long)]
        last_k: Option<u32>,
        /// Print the ingested text instead of summarizing it.
        #[arg(long)]
        content: bool,
    },
    #[command(subcommand)]
    Live(LiveCommand),
    /// List the notebook's jobs.
    Jobs,
    /// Print the 2-D projection of the notebook's chunks.
    Pca,
    /// Write the notebook to a local file.
    Export(ExportArgs),
    /// Print events pushed for the notebook until interrupted.
    Watch {
        /// Send a ping first.
        #[arg(long)]
        ping: bool,
    },
    /// Ask the service to push a ping event.
    Ping,
    /// Print the effective settings.
    Config {
        /// Write the effective settings to the settings file.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
pub enum LiveCommand {
    /// Start capturing a live source.
    Start {
        #[arg(value_parser = parse_source_kind, default_value = "sound")]
        kind: SourceKind,
        origin: String,
    },
    Stop { source_id: String },
    List,
    Summary {
        source_id: String,
        #[arg(long)]
        last_k: Option<u32>,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    pub output: PathBuf,
    #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
    pub format: ExportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Plain text with a header block.
    Text,
    /// The notebook record as fetched.
    Json,
}

fn parse_source_kind(value: &str) -> Result<SourceKind, String> {
    value.parse()
}
