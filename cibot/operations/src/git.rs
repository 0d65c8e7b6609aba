// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use cibot_util::{app::App, git_helper};

/// Executes `git` subcommands.
///
/// Implementations return stdout with the trailing line break removed and fail
/// with [`cibot_util::sandbox_command::CommandFailed`] when git exits non-zero.
pub trait Git {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String>;
}

/// Runs the `git` binary, capturing its output in the app's sandbox.
#[derive(Debug, Clone)]
pub struct SystemGit {
    app: Arc<App>,
}

impl SystemGit {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }
}

impl Git for SystemGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        git_helper::run_consuming_stdout(cwd, args, self.app.clone())
    }
}
