// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cibot_tracing::TracingOpts;
use cibot_util::{
    app::{App, ExitCode},
    paths,
    sandbox_command::CommandFailed,
};
use clap::Args;
use tracing::{error, info};

/// Flags shared by every binary.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonOpts {
    /// Keep the captured output of external commands after exiting
    #[clap(long)]
    pub preserve_sandbox: bool,

    /// Directory `cibot.log` is appended to
    #[clap(long, parse(from_os_str), env = "CIBOT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Disable colored log output
    #[clap(long)]
    pub no_color: bool,
}

/// Exit code for a failed run: the code of the external command that failed,
/// or 1 when the failure did not come from an external command.
pub fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    ExitCode(CommandFailed::find_in(error).map_or(1, |failure| failure.code))
}

/// The explicit `-CI_WORK_PATH` (or `$CI_WORK_PATH`) with `~` expanded, else
/// the current directory.
pub fn resolve_ci_work_path(ci_work_path: Option<PathBuf>) -> Result<PathBuf> {
    match ci_work_path.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => paths::expand_tilde(path),
        None => std::env::current_dir().context("Determining the current directory"),
    }
}

/// Set up logging and the [`App`], run `body`, and turn its outcome into the
/// process exit code. Logging is flushed before this returns.
pub fn run_main<F>(common: &CommonOpts, command_name: &str, body: F) -> ExitCode
where
    F: FnOnce(Arc<App>) -> Result<ExitCode>,
{
    let _guard = match cibot_tracing::init_tracing(TracingOpts {
        is_tty: termion::is_tty(&std::io::stderr()),
        no_color: common.no_color,
        log_dir: common.log_dir.clone(),
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:?}", e);
            return ExitCode(1);
        }
    };

    let result = App::new(common.preserve_sandbox, Some(command_name))
        .and_then(|app| body(Arc::new(app)));
    match result {
        Ok(exit_code) => {
            info!(code = exit_code.0, "{} finished", command_name);
            exit_code
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);
            error!(code = exit_code.0, "{} failed: {:?}", command_name, e);
            exit_code
        }
    }
}
