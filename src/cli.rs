use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::infra::table::TableFormat;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
    pub config: Option<PathBuf>, // global --config
}

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(
    about = "Reconcile a candidate ledger of weighing tickets against a reference ledger"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Log run statistics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of searching the working directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify candidate rows against the reference ledger and write annotated tables
    Reconcile(ReconcileArgs),

    /// Check that both inputs carry the configured columns
    Check(CheckArgs),

    /// Initialize a ledgermatch.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs and column bindings shared by `reconcile` and `check`
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Reference ledger (JSON array or .jsonl)
    #[arg(short, long, value_name = "FILE")]
    pub reference: PathBuf,

    /// Candidate ledger (JSON array or .jsonl)
    #[arg(short, long, value_name = "FILE")]
    pub candidates: PathBuf,

    /// Ticket-number column in the reference ledger
    #[arg(long, value_name = "COLUMN")]
    pub ref_key: Option<String>,

    /// Weight column in the reference ledger
    #[arg(long, value_name = "COLUMN")]
    pub ref_weight: Option<String>,

    /// Ticket-number column in the candidate ledger
    #[arg(long, value_name = "COLUMN")]
    pub cand_key: Option<String>,

    /// Weight column in the candidate ledger
    #[arg(long, value_name = "COLUMN")]
    pub cand_weight: Option<String>,

    /// Candidate column used to select the rows to classify
    #[arg(long, value_name = "COLUMN", requires = "partition_value")]
    pub partition_field: Option<String>,

    /// Value of --partition-field selecting the rows to classify
    #[arg(long, value_name = "VALUE", requires = "partition_field")]
    pub partition_value: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output directory for annotated tables and summary.json
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Encoding of the annotated tables
    #[arg(long, value_enum)]
    pub format: Option<TableFormat>,

    /// Decimal places used when comparing weights
    #[arg(long)]
    pub round_digits: Option<u32>,

    /// Fail if the reference ledger repeats a ticket number
    #[arg(long)]
    pub reject_duplicates: bool,

    /// Print the summary as a single JSON line
    #[arg(long)]
    pub json: bool,

    /// Print the rows whose weight differs from the reference
    #[arg(long)]
    pub show_flagged: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Emit the check result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory receiving the completion script
    #[arg(long, required_unless_present = "stdout", conflicts_with = "stdout")]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
