// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{ffi::OsStr, path::Path, process::Command, sync::Arc};

use anyhow::Result;

use crate::{
    app::App,
    sandbox_command::{SandboxCommand, SandboxCommandOutput},
};

pub use cibot_testing::GitBinary;

pub fn git_command(app: Arc<App>) -> Result<(Command, SandboxCommand)> {
    let git_binary = app.git_binary();
    let mut cmd = git_binary.command();
    let scmd = SandboxCommand::with_command(&mut cmd, app)?;
    Ok((cmd, scmd))
}

/// Run `git <args>` in `repo`, returning stdout without its trailing line break.
///
/// A non-zero exit logs the captured stdout and stderr and yields
/// [`crate::sandbox_command::CommandFailed`].
pub fn run_consuming_stdout<P, I, O>(repo: P, args: I, app: Arc<App>) -> Result<String>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = O>,
    O: AsRef<OsStr>,
{
    // `app` also owns the git binary's environment, so hold it until git exits.
    let (mut cmd, scmd) = git_command(app.clone())?;
    cmd.current_dir(repo).args(args);
    scmd.ensure_success_or_log(&mut cmd, SandboxCommandOutput::All)?;
    let stdout_contents = scmd.read_to_string(SandboxCommandOutput::Stdout)?;
    Ok(strip_line_break(&stdout_contents).to_owned())
}

pub fn strip_line_break(s: &str) -> &str {
    s.trim_end_matches(&['\r', '\n'][..])
}
