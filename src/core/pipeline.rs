//! `reconcile` and `check` command handlers: the I/O shell around the core.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::cli::{AppContext, CheckArgs, InputArgs, ReconcileArgs};
use crate::core::error::PreconditionError;
use crate::core::index::{DuplicatePolicy, ReferenceIndex};
use crate::core::reconcile::{ReconcileOptions, Reconciler};
use crate::core::report::{OutputPaths, SummaryDocument, render_flagged, render_summary};
use crate::infra::config::load_config_from;
use crate::infra::io::{expand_path, load_table, write_table, write_text};
use crate::infra::table::{Table, TableFormat};

/// Apply command-line overrides on top of the configured options.
pub fn resolve_options(base: &ReconcileOptions, input: &InputArgs) -> ReconcileOptions {
    let mut options = base.clone();
    let cols = &mut options.columns;

    if let Some(v) = &input.ref_key {
        cols.key_field_reference = v.clone();
    }
    if let Some(v) = &input.ref_weight {
        cols.weight_field_reference = v.clone();
    }
    if let Some(v) = &input.cand_key {
        cols.key_field_candidate = v.clone();
    }
    if let Some(v) = &input.cand_weight {
        cols.weight_field_candidate = v.clone();
    }
    if input.partition_field.is_some() {
        options.partition_field = input.partition_field.clone();
        options.partition_value = input.partition_value.clone();
    }

    options
}

fn spinner(ctx: &AppContext) -> Result<ProgressBar> {
    if ctx.quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

struct LoadedInputs {
    reference_path: PathBuf,
    candidates_path: PathBuf,
    reference: Table,
    candidates: Table,
}

fn load_inputs(input: &InputArgs, progress: &ProgressBar) -> Result<LoadedInputs> {
    let reference_path = expand_path(&input.reference)?;
    let candidates_path = expand_path(&input.candidates)?;

    progress.set_message(format!("Loading {}", reference_path.display()));
    let reference = load_table(&reference_path).context("Failed to load reference ledger")?;

    progress.set_message(format!("Loading {}", candidates_path.display()));
    let candidates = load_table(&candidates_path).context("Failed to load candidate ledger")?;

    debug!(
        reference_rows = reference.len(),
        candidate_rows = candidates.len(),
        "inputs loaded"
    );

    Ok(LoadedInputs { reference_path, candidates_path, reference, candidates })
}

#[instrument(skip_all)]
pub fn run(args: ReconcileArgs, ctx: &AppContext) -> Result<()> {
    let started = Instant::now();
    let config = load_config_from(ctx.config.as_deref())?;

    let mut options = resolve_options(&config.reconcile, &args.input);
    if let Some(digits) = args.round_digits {
        options.weight_round_digits = digits;
    }
    if args.reject_duplicates {
        options.duplicate_policy = DuplicatePolicy::Reject;
    }

    let progress = spinner(ctx)?;
    let inputs = load_inputs(&args.input, &progress)?;

    progress.set_message("Reconciling");
    let reconciler = Reconciler::new(options);
    let outcome = reconciler.run(&inputs.reference, &inputs.candidates);
    progress.finish_and_clear();
    let recon = outcome.map_err(precondition_failure)?;

    let out_dir = expand_path(args.out_dir.as_deref().unwrap_or(config.output.dir.as_path()))?;
    let format = args
        .format
        .or(config.output.format)
        .unwrap_or_else(|| TableFormat::from_path(&inputs.reference_path));
    let paths = OutputPaths {
        reference: out_dir.join(format!("reference.{}", format.extension())),
        candidates: out_dir.join(format!("candidates.{}", format.extension())),
        summary: out_dir.join("summary.json"),
    };

    let mut doc = SummaryDocument::new(
        inputs.reference_path.clone(),
        inputs.candidates_path.clone(),
        reconciler.options(),
        recon.summary,
        started.elapsed(),
    );

    if !ctx.dry_run {
        write_table(&paths.reference, &recon.reference, format)?;
        write_table(&paths.candidates, &recon.candidates, format)?;
        doc.outputs = Some(paths.clone());
        let body = serde_json::to_string_pretty(&doc).context("Failed to serialize summary")?;
        write_text(&paths.summary, &body)?;
        info!(dir = %out_dir.display(), "results written");
    }

    if args.json {
        println!("{}", serde_json::to_string(&doc).context("Failed to serialize summary")?);
        return Ok(());
    }

    if ctx.quiet {
        return Ok(());
    }

    if ctx.dry_run {
        println!("{}", "DRY RUN: Would write:".yellow());
        for p in [&paths.reference, &paths.candidates, &paths.summary] {
            println!("  {}", p.display());
        }
    }

    print!("{}", render_summary(&recon.summary, started.elapsed(), ctx));

    if (args.show_flagged || config.output.show_flagged)
        && let Some(table) = render_flagged(&recon, reconciler.options())
    {
        println!("{table}");
    }

    if !ctx.dry_run {
        let mark = if ctx.no_color { "✓".to_string() } else { "✓".green().to_string() };
        println!("{} Results written to {}", mark, out_dir.display());
    }

    Ok(())
}

#[instrument(skip_all)]
pub fn check(args: CheckArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config_from(ctx.config.as_deref())?;
    let options = resolve_options(&config.reconcile, &args.input);

    let progress = spinner(ctx)?;
    let inputs = load_inputs(&args.input, &progress)?;
    progress.finish_and_clear();

    let reconciler = Reconciler::new(options);
    let outcome = reconciler.validate(&inputs.reference, &inputs.candidates).and_then(|schema| {
        let opts = reconciler.options();
        if opts.duplicate_policy == DuplicatePolicy::Reject {
            ReferenceIndex::build(
                &inputs.reference,
                &opts.columns.key_field_reference,
                &opts.columns.weight_field_reference,
                DuplicatePolicy::Reject,
            )?;
        }
        Ok(schema)
    });

    match outcome {
        Ok(_) => {
            if args.json {
                let v = json!({
                    "ok": true,
                    "reference_rows": inputs.reference.len(),
                    "candidate_rows": inputs.candidates.len(),
                });
                println!("{v}");
            } else if !ctx.quiet {
                report_ok(&inputs, ctx);
            }
            Ok(())
        }
        Err(err) => {
            if args.json {
                let v = json!({
                    "ok": false,
                    "error": err.to_string(),
                    "code": miette::Diagnostic::code(&err).map(|c| c.to_string()),
                    "help": miette::Diagnostic::help(&err).map(|h| h.to_string()),
                });
                println!("{v}");
                return Err(anyhow::Error::new(err).context(SCHEMA_CHECK_FAILED));
            }
            Err(precondition_failure(err))
        }
    }
}

const SCHEMA_CHECK_FAILED: &str = "Input tables failed the schema check";

/// Print the diagnostic with its help text, then hand the error to anyhow.
fn precondition_failure(err: PreconditionError) -> anyhow::Error {
    eprintln!("{:?}", miette::Report::new(err.clone()));
    anyhow::Error::new(err).context(SCHEMA_CHECK_FAILED)
}

fn report_ok(inputs: &LoadedInputs, ctx: &AppContext) {
    let mark = if ctx.no_color { "✓".to_string() } else { "✓".green().to_string() };
    for (path, table) in [
        (&inputs.reference_path, &inputs.reference),
        (&inputs.candidates_path, &inputs.candidates),
    ] {
        println!("{} {} ({} rows)", mark, path.display(), table.len());
    }
}
