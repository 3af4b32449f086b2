//! **ledgermatch** - Reconcile two weighing-ticket ledgers
//!
//! Normalizes ticket numbers, indexes the reference ledger, classifies every
//! candidate row under a rounding tolerance and flags reference tickets the
//! candidate ledger never mentions.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Reconciliation engine and the command handlers around it
pub mod core {
    /// Ticket-number canonicalization into comparable keys
    pub mod normalize;
    pub use normalize::{TicketKey, normalize, normalize_str};

    /// Weight comparison at a rounding precision
    pub mod tolerance;
    pub use tolerance::Tolerance;

    /// Schema precondition errors
    pub mod error;
    pub use error::{PreconditionError, TableRole};

    /// Key -> weight lookup over the reference ledger
    pub mod index;
    pub use index::{DuplicatePolicy, ReferenceIndex};

    /// Verdict taxonomy and summary counts
    pub mod verdict;
    pub use verdict::{Classification, Summary, Verdict, VerdictLabels};

    /// Candidate classification and unmatched-reference detection
    pub mod reconcile;
    pub use reconcile::{ReconcileOptions, Reconciler, Reconciliation, classify, unmatched_reference};

    /// Text, table and JSON renderings of a run
    pub mod report;

    /// `reconcile` / `check` command handlers
    pub mod pipeline;
    pub use pipeline::{check as check_run, run as reconcile_run};
}

/// Infrastructure - Configuration, I/O, and the table model
pub mod infra {
    /// Layered configuration with TOML defaults and env overrides
    pub mod config;
    pub use config::{Config, init as config_init, load_config, load_config_from};

    /// File loading (memory-mapped above 1 MiB) and output writing
    pub mod io;
    pub use io::{load_table, read_file_smart, write_table};

    /// Cells, tables and their JSON / JSON Lines encodings
    pub mod table;
    pub use table::{Cell, Table, TableFormat};
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{check_run, reconcile_run};
pub use infra::{Cell, Config, Table, TableFormat, load_config};

// Core types for external consumers
pub use crate::core::{Classification, ReconcileOptions, Reconciler, Reconciliation, Summary, Verdict};
