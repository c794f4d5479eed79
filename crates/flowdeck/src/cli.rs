//! Clap derive structures for the `flowdeck` CLI.
//!
//! Defines the command tree, global flags, and shared enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// flowdeck -- inspect queue backends and job flows
#[derive(Debug, Parser)]
#[command(
    name = "flowdeck",
    version,
    about = "Inspect queue backends and job flows from the command line",
    long_about = "Control-plane CLI for queue backends.\n\n\
        Connects to a BullMQ deployment over Redis, lists job flows, and\n\
        reconstructs a flow's full dependency tree with status roll-ups.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend connection URL (overrides the config file)
    #[arg(long, short = 'u', env = "FLOWDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLOWDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "FLOWDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table / indented tree (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect job flows (parent jobs with dependent children)
    #[command(alias = "f")]
    Flows(FlowsArgs),

    /// List queues known to the backend
    #[command(alias = "q")]
    Queues(QueuesArgs),

    /// Show connection status and backend capabilities
    Status,

    /// Manage the flowdeck configuration file
    Config(ConfigArgs),
}

// ── Flows ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FlowsArgs {
    #[command(subcommand)]
    pub command: FlowsCommand,
}

#[derive(Debug, Subcommand)]
pub enum FlowsCommand {
    /// List all flows across all queues, newest first
    #[command(alias = "ls")]
    List,

    /// Reconstruct one flow's full dependency tree
    Get {
        /// Queue holding the flow's root job
        queue: String,

        /// Root job id
        flow_id: String,

        /// Re-fetch every two seconds while the flow has live jobs
        #[arg(long, short = 'w')]
        watch: bool,
    },
}

// ── Queues ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct QueuesArgs {
    #[command(subcommand)]
    pub command: QueuesCommand,
}

#[derive(Debug, Subcommand)]
pub enum QueuesCommand {
    /// List queue names
    #[command(alias = "ls")]
    List,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,

    /// Write a default config file if none exists
    Init,

    /// Print the config file path
    Path,
}
