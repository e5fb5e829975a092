mod config;
mod detect;
mod error;
mod executor;
mod logging;
mod phase;
mod probe;
mod report;
mod session;
mod shell;
#[cfg(test)]
mod test_support;

use crate::config::{
    ensure_parent, load_config, read_config, resolve_config_path, Config, DEFAULT_CONFIG_YAML,
};
use crate::detect::detect;
use crate::error::TetherError;
use crate::executor::GitOperator;
use crate::phase::{select, Phase, Snapshot};
use crate::probe::probe;
use crate::session::{Session, Targets};
use crate::shell::{TerminalShell, UnattendedShell};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Create or sync a local install of a git-published distribution")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    /// Answer every prompt with its first button instead of asking.
    #[arg(long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk through creating or syncing the local install (default).
    Run,
    /// Report the detected install, both versions and the phase a run would offer.
    Check,
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Init,
    Validate,
}

#[derive(Debug, Serialize)]
struct JsonResult<T: Serialize> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug)]
struct Context {
    config_path: PathBuf,
    json: bool,
    yes: bool,
}

fn main() -> Result<(), TetherError> {
    let cli = Cli::parse();
    logging::init();
    let ctx = build_context(&cli);

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => handle_run(&ctx),
        Commands::Check => handle_check(&ctx).map(|()| true),
        Commands::Config { command } => handle_config(&ctx, command).map(|()| true),
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            if ctx.json {
                let payload = JsonResult::<serde_json::Value> {
                    ok: false,
                    result: None,
                    error: Some(err.to_string()),
                };
                print_json(&payload)?;
            } else {
                eprintln!("{err}");
            }
            std::process::exit(1);
        }
    }
}

fn build_context(cli: &Cli) -> Context {
    Context {
        config_path: resolve_config_path(cli.config.as_ref()),
        json: cli.json,
        yes: cli.yes,
    }
}

/// Detects the install tree and probes both versions. Only a failure to
/// resolve the install path is fatal; version lookups degrade to empty.
fn startup(cfg: &Config) -> Result<(Snapshot, Targets), TetherError> {
    let tree = detect(Path::new(&cfg.install.dir))?;
    let versions = probe(&cfg.version_file_in(&tree.path), &cfg.remote.version_url);
    tracing::debug!(
        path = %tree.path.display(),
        exists = tree.exists,
        local = ?versions.local,
        remote = %versions.remote,
        "startup state"
    );
    let targets = Targets {
        repository: cfg.remote.repository.clone(),
        transcript_file: PathBuf::from(&cfg.log.transcript_file),
        version_file: cfg.install.version_file.clone(),
    };
    Ok((Snapshot { tree, versions }, targets))
}

/// Runs the session and reports how it ended. Returns `Ok(false)` when the
/// session ended on the error page.
fn handle_run(ctx: &Context) -> Result<bool, TetherError> {
    if !ctx.yes && !io::stdin().is_terminal() {
        return Err(TetherError::Process(
            "interactive install requires a TTY; re-run with `--yes` to accept every prompt"
                .to_string(),
        ));
    }
    let cfg = load_config(&ctx.config_path)?;
    let (snapshot, targets) = startup(&cfg)?;
    let operator = GitOperator;
    let mut session = Session::new(snapshot, targets, &operator);
    if ctx.yes {
        session.run(&mut UnattendedShell::new(io::stderr()))?;
    } else {
        session.run(&mut TerminalShell::new())?;
    }

    let summary = session.summary();
    let ok = summary.phase != Phase::Error;
    if ctx.json {
        let error = summary.error.clone();
        print_json(&JsonResult {
            ok,
            result: Some(summary),
            error,
        })?;
    } else if ctx.yes {
        println!("{}", serde_json::to_value(&summary)?);
    }
    Ok(ok)
}

fn handle_check(ctx: &Context) -> Result<(), TetherError> {
    let cfg = load_config(&ctx.config_path)?;
    let (snapshot, _) = startup(&cfg)?;
    let selection = select(&snapshot);
    output(
        ctx,
        json!({
            "install_path": snapshot.tree.path,
            "tree_exists": snapshot.tree.exists,
            "local_version": snapshot.versions.local,
            "remote_version": snapshot.versions.remote,
            "phase": selection.phase,
            "operation": selection.operation,
            "up_to_date": snapshot.versions.local.as_deref() == Some(snapshot.versions.remote.as_str()),
        }),
    )
}

fn handle_config(ctx: &Context, command: ConfigCommand) -> Result<(), TetherError> {
    match command {
        ConfigCommand::Init => {
            if ctx.config_path.exists() {
                return output(ctx, json!({"path": ctx.config_path, "created": false}));
            }
            ensure_parent(&ctx.config_path)?;
            fs::write(&ctx.config_path, DEFAULT_CONFIG_YAML)?;
            output(ctx, json!({"path": ctx.config_path, "created": true}))
        }
        ConfigCommand::Validate => {
            let _cfg = read_config(&ctx.config_path)?;
            output(ctx, json!({"path": ctx.config_path, "valid": true}))
        }
    }
}

fn output(ctx: &Context, payload: serde_json::Value) -> Result<(), TetherError> {
    if ctx.json {
        let wrapper = JsonResult {
            ok: true,
            result: Some(payload),
            error: None,
        };
        print_json(&wrapper)?;
    } else {
        println!("{}", payload);
    }
    Ok(())
}

fn print_json<T: Serialize>(payload: &T) -> Result<(), TetherError> {
    let text = serde_json::to_string_pretty(payload)?;
    println!("{}", text);
    Ok(())
}
