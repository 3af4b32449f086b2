use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::reconcile::ReconcileOptions;
use crate::infra::table::TableFormat;

/// Config file names searched in the working directory, first match wins
pub const CONFIG_FILES: [&str; 4] = [
    "ledgermatch.toml",
    "ledgermatch.yaml",
    "ledgermatch.json",
    ".ledgermatch.toml",
];

/// Prefix for environment overrides, e.g.
/// `LEDGERMATCH_RECONCILE__WEIGHT_ROUND_DIGITS=2`
pub const ENV_PREFIX: &str = "LEDGERMATCH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Column bindings, partition filter and comparison settings
    pub reconcile: ReconcileOptions,

    /// Where and how results are written
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    /// Directory receiving annotated tables and the summary
    pub dir: PathBuf,

    /// Table encoding; follows the reference input's extension when unset
    pub format: Option<TableFormat>,

    /// Print discrepant rows as a table after the summary
    pub show_flagged: bool,
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self {
            dir: PathBuf::from("ledgermatch-out"),
            format: None,
            show_flagged: false,
        }
    }
}

/// Load configuration from the first config file found in the working
/// directory, then `LEDGERMATCH_*` environment variables.
pub fn load_config() -> Result<Config>
{
    load_config_from(None)
}

/// Like [`load_config`], but an explicit file replaces the search.
pub fn load_config_from(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }
        None =>
        {
            for path in &CONFIG_FILES
            {
                if Path::new(path).exists()
                {
                    builder = builder.add_source(config::File::with_name(path));
                    break;
                }
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: Would write {}:\n{}", config_path.display(), toml_string);
        }
        return Ok(());
    }

    std::fs::create_dir_all(&args.path)
        .with_context(|| format!("Failed to create {}", args.path.display()))?;
    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::index::DuplicatePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
        assert!(text.contains("[reconcile.columns]"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let path = tmp
            .path()
            .join("custom.toml");
        std::fs::write(
            &path,
            r#"
[reconcile]
weight_round_digits = 0
duplicate_policy = "reject"
partition_field = "Bestemming"
partition_value = "Berkel"

[reconcile.columns]
key_field_candidate = "Weegbonnummer"

[output]
format = "jsonl"
"#,
        )?;

        let cfg = load_config_from(Some(&path))?;
        assert_eq!(cfg.reconcile.weight_round_digits, 0);
        assert_eq!(cfg.reconcile.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(cfg.reconcile.partition(), Some(("Bestemming", "Berkel")));
        assert_eq!(cfg.reconcile.columns.key_field_candidate, "Weegbonnummer");
        assert_eq!(cfg.reconcile.columns.key_field_reference, "ticket_number");
        assert_eq!(cfg.output.format, Some(TableFormat::Jsonl));
        assert_eq!(cfg.output.dir, PathBuf::from("ledgermatch-out"));
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error()
    {
        assert!(load_config_from(Some(Path::new("nope/ledgermatch.toml"))).is_err());
    }

    #[test]
    fn test_init_refuses_to_overwrite() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let ctx = AppContext { quiet: true, no_color: true, dry_run: false, verbose: false, config: None };

        init(InitArgs { path: tmp.path().to_path_buf(), force: false }, &ctx)?;
        assert!(tmp.path().join("ledgermatch.toml").exists());

        let again = init(InitArgs { path: tmp.path().to_path_buf(), force: false }, &ctx);
        assert!(again.is_err());

        init(InitArgs { path: tmp.path().to_path_buf(), force: true }, &ctx)?;
        Ok(())
    }
}
