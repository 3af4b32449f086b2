use anyhow::Result;
use clap::Parser;
use ledgermatch::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Log to stderr; `LEDGERMATCH_LOG` wins over `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("LEDGERMATCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        config: cli.config,
    };

    match cli.command {
        Commands::Reconcile(args) => ledgermatch::reconcile_run(args, &ctx),
        Commands::Check(args) => ledgermatch::check_run(args, &ctx),
        Commands::Init(args) => ledgermatch::infra::config::init(args, &ctx),
        Commands::Completions(args) => ledgermatch::completion::run(args, &ctx),
    }
}
