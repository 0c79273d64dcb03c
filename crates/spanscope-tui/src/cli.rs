use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use spanscope::{RenderConfig, TraceFilter, ViewMode};
use spanscope_store::StoreConfig;

#[derive(Parser)]
#[command(name = "spanscope")]
#[command(about = "Explore distributed traces in the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse traces interactively
    View {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        render: RenderArgs,

        /// Where logs go while the terminal is in use
        #[arg(long, env = "SPANSCOPE_LOG_FILE", default_value = "spanscope.log")]
        log_file: PathBuf,

        /// Open this trace on startup
        #[arg(long)]
        trace_id: Option<String>,
    },

    /// Print one trace as text
    Dump {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        render: RenderArgs,

        /// Trace to print (defaults to the newest one)
        #[arg(long)]
        trace_id: Option<String>,

        #[arg(long, value_enum, default_value_t = DumpMode::Waterfall)]
        mode: DumpMode,

        /// Expand every node in tree mode
        #[arg(long)]
        expand_all: bool,
    },

    /// List stored traces, newest first
    List {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// JSON file with spans or traces
    #[arg(short, long, env = "SPANSCOPE_FILE")]
    pub file: Option<PathBuf>,

    /// Load built-in sample traces
    #[arg(long, env = "SPANSCOPE_SEED")]
    pub seed: bool,

    /// TTL for traces in seconds
    #[arg(long, env = "SPANSCOPE_TTL", default_value = "3600")]
    pub ttl: u64,

    /// Artificial fetch latency in milliseconds
    #[arg(long, env = "SPANSCOPE_LATENCY_MS", default_value = "0")]
    pub latency_ms: u64,
}

impl SourceArgs {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            ttl: Duration::from_secs(self.ttl),
            latency: Duration::from_millis(self.latency_ms),
            ..Default::default()
        }
    }
}

#[derive(Args)]
pub struct RenderArgs {
    /// Columns of indentation per tree level
    #[arg(long, env = "SPANSCOPE_INDENT_WIDTH", default_value = "2")]
    pub indent_width: usize,

    /// Width of a full-length duration bar
    #[arg(long, env = "SPANSCOPE_BAR_WIDTH", default_value = "40")]
    pub bar_width: u16,

    /// Attributes previewed per waterfall row
    #[arg(long, env = "SPANSCOPE_ATTRIBUTE_PREVIEW", default_value = "4")]
    pub attribute_preview: usize,
}

impl From<RenderArgs> for RenderConfig {
    fn from(args: RenderArgs) -> Self {
        RenderConfig {
            indent_width: args.indent_width,
            attribute_preview: args.attribute_preview,
            bar_width: args.bar_width,
        }
    }
}

#[derive(Args)]
pub struct FilterArgs {
    /// Only traces touching this service
    #[arg(long)]
    pub service: Option<String>,

    #[arg(long)]
    pub min_duration_ms: Option<f64>,

    #[arg(long)]
    pub max_duration_ms: Option<f64>,

    /// Only traces with (or, with `--errors=false`, without) HTTP errors
    #[arg(long)]
    pub errors: Option<bool>,

    #[arg(long, default_value = "100")]
    pub limit: usize,
}

impl From<FilterArgs> for TraceFilter {
    fn from(args: FilterArgs) -> Self {
        TraceFilter {
            service: args.service,
            min_duration_ms: args.min_duration_ms,
            max_duration_ms: args.max_duration_ms,
            has_errors: args.errors,
            limit: Some(args.limit),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DumpMode {
    Waterfall,
    Tree,
}

impl From<DumpMode> for ViewMode {
    fn from(mode: DumpMode) -> Self {
        match mode {
            DumpMode::Waterfall => ViewMode::Waterfall,
            DumpMode::Tree => ViewMode::Tree,
        }
    }
}
