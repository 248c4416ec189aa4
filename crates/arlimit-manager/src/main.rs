//! `arlimit`: keeps active-response limits in step with `ar.conf`.
//!
//! Every invocation loads the limits file, reconciles it against the commands
//! declared in `ar.conf` (adding new ones, dropping stale ones), writes it
//! back, and then runs the requested subcommand.
//!
//! # Usage
//!
//! ```text
//! arlimit [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show         Print the global limit and per-command limits
//!   set-global   Set the global limit
//!   set          Set limits for existing commands (NAME=VALUE ...)
//!   sync         Re-read ar.conf and reconcile
//!   init-config  Write a default settings file
//!
//! Options:
//!   --config <PATH>            Settings file [env: ARLIMIT_CONFIG]
//!   --limits-file <PATH>       Limits YAML [env: ARLIMIT_LIMITS_FILE]
//!   --commands-file <PATH>     ar.conf [env: ARLIMIT_COMMANDS_FILE]
//!   --default-limit <POLICY>   inherit-global | N
//!   --strict                   Fail instead of using defaults on load errors
//!   --missing-commands <MODE>  skip | empty
//! ```
//!
//! Logs go to stderr; the level comes from `RUST_LOG`, then the settings
//! file's `log_level`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use arlimit_core::{DefaultLimitPolicy, Limit, LimitsDocument};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arlimit_manager::application::{
    LimitsManager, LoadFailurePolicy, MissingCommandsPolicy, SyncPolicy,
};
use arlimit_manager::infrastructure::storage::config::{
    config_file_path, load_config, save_config, AppConfig,
};
use arlimit_manager::infrastructure::storage::{ArConfCommandSource, YamlLimitsStore};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Active-response limits manager.
#[derive(Debug, Parser)]
#[command(
    name = "arlimit",
    about = "Synchronise and edit active-response limits against ar.conf",
    version
)]
struct Cli {
    /// Settings file; defaults to the platform config directory.
    #[arg(long, global = true, env = "ARLIMIT_CONFIG")]
    config: Option<PathBuf>,

    /// Limits YAML file.
    #[arg(long, global = true, env = "ARLIMIT_LIMITS_FILE")]
    limits_file: Option<PathBuf>,

    /// Active-response command declarations.
    #[arg(long, global = true, env = "ARLIMIT_COMMANDS_FILE")]
    commands_file: Option<PathBuf>,

    /// Limit given to newly declared commands: `inherit-global` or a number.
    #[arg(long, global = true)]
    default_limit: Option<DefaultLimitPolicy>,

    /// Abort when the limits file is missing or unreadable.
    #[arg(long, global = true)]
    strict: bool,

    /// Behaviour when the command declarations cannot be read.
    #[arg(long, global = true, value_enum)]
    missing_commands: Option<MissingCommandsArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the global limit and per-command limits.
    Show {
        /// Only these commands; unknown names are ignored.
        names: Vec<String>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Set the global limit.
    SetGlobal {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Set limits for commands that already exist.
    Set {
        /// `NAME=VALUE` pairs.
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, i64)>,
    },
    /// Re-read the command declarations and reconcile.
    Sync,
    /// Write a settings file with the effective values.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MissingCommandsArg {
    /// Leave custom limits untouched.
    Skip,
    /// Remove every custom limit.
    Empty,
}

impl From<MissingCommandsArg> for MissingCommandsPolicy {
    fn from(arg: MissingCommandsArg) -> Self {
        match arg {
            MissingCommandsArg::Skip => MissingCommandsPolicy::Skip,
            MissingCommandsArg::Empty => MissingCommandsPolicy::TreatAsEmpty,
        }
    }
}

/// Parses `NAME=VALUE`.
fn parse_assignment(s: &str) -> Result<(String, i64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing command name in '{s}'"));
    }
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not an integer", value.trim()))?;
    Ok((name.to_string(), value))
}

impl Cli {
    /// Applies command-line overrides on top of the settings file.
    fn apply_overrides(&self, mut config: AppConfig) -> AppConfig {
        if let Some(path) = &self.limits_file {
            config.paths.limits_file = path.clone();
        }
        if let Some(path) = &self.commands_file {
            config.paths.commands_file = path.clone();
        }
        if let Some(policy) = self.default_limit {
            config.sync.default_command_limit = policy;
        }
        if self.strict {
            config.sync.on_load_failure = LoadFailurePolicy::Fail;
        }
        if let Some(mode) = self.missing_commands {
            config.sync.on_missing_commands = mode.into();
        }
        config
    }
}

// ── Output rendering ──────────────────────────────────────────────────────────

fn render_text(global: Limit, limits: &BTreeMap<String, Limit>) -> String {
    let mut out = format!("global-limit: {global}\n");
    for (name, limit) in limits {
        out.push_str(&format!("{name}: {limit}\n"));
    }
    out
}

fn render_json(global: Limit, limits: &BTreeMap<String, Limit>) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "global_limit": global,
        "custom_limits": limits,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn show(document: &LimitsDocument, names: &[String], json: bool) -> anyhow::Result<String> {
    let limits = document.limits_for(Some(names));
    if json {
        render_json(document.global_limit(), &limits)
    } else {
        Ok(render_text(document.global_limit(), &limits))
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // An explicit --config must exist; the platform default may be absent.
    let config_path = match &cli.config {
        Some(path) => {
            if !path.exists() && !matches!(cli.command, Command::InitConfig { .. }) {
                bail!("settings file {} does not exist", path.display());
            }
            Some(path.clone())
        }
        None => config_file_path().ok(),
    };
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppConfig::default(),
    };
    let config = cli.apply_overrides(config);

    // `RUST_LOG` wins over the settings file.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Command::InitConfig { force } => {
            let Some(config_path) = config_path else {
                bail!("no platform config directory; pass --config <PATH>");
            };
            if config_path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite",
                    config_path.display()
                );
            }
            save_config(&config, &config_path)
                .with_context(|| format!("writing settings to {}", config_path.display()))?;
            println!("wrote {}", config_path.display());
        }
        Command::Show { names, json } => {
            let manager = open_manager(&config)?;
            print!("{}", show(manager.document(), &names, json)?);
        }
        Command::SetGlobal { value } => {
            let mut manager = open_manager(&config)?;
            manager.update_global_limit(value)?;
            println!("global-limit: {}", manager.global_limit());
        }
        Command::Set { assignments } => {
            let mut manager = open_manager(&config)?;
            let report = manager.update_command_limits(assignments)?;
            let limits = manager.get_limits(None);
            for name in &report.updated {
                if let Some(limit) = limits.get(name) {
                    println!("{name}: {limit}");
                }
            }
            if !report.skipped.is_empty() {
                eprintln!("skipped (not declared): {}", report.skipped.join(", "));
            }
        }
        Command::Sync => {
            let mut manager = open_manager(&config)?;
            let report = manager.synchronize()?;
            for name in &report.added {
                println!("+ {name}");
            }
            for name in &report.removed {
                println!("- {name}");
            }
            if report.is_empty() {
                println!("already in sync");
            }
        }
    }

    Ok(())
}

/// Opens the file-backed manager; this loads, reconciles and rewrites the
/// limits file.
fn open_manager(
    config: &AppConfig,
) -> anyhow::Result<LimitsManager<YamlLimitsStore, ArConfCommandSource>> {
    let policy: SyncPolicy = config.sync.policy();
    info!(
        limits = %config.paths.limits_file.display(),
        commands = %config.paths.commands_file.display(),
        default_limit = %policy.default_command_limit,
        "opening limits"
    );

    let manager = LimitsManager::open(
        YamlLimitsStore::new(&config.paths.limits_file),
        ArConfCommandSource::new(&config.paths.commands_file),
        policy,
    )?;
    Ok(manager)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
