// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;
use std::sync::Arc;

use crate::sandbox::Sandbox;
use anyhow::{Context, Result};
use cibot_testing::GitBinary;

#[must_use = "The exit code for the application should be returned and bubbled up to `main` so that it can be passed to `std::process::exit`."]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
}

/// Process-wide collaborators: the git binary and the sandbox that captures
/// the output of every external command.
#[derive(Clone)]
pub struct App {
    git_binary: GitBinary,
    sandbox: Arc<Sandbox>,
}

impl Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("sandbox", &self.sandbox.path())
            .finish()
    }
}

impl App {
    pub fn new_for_testing() -> Result<Self> {
        let git_binary = GitBinary::for_testing()?;
        Self::with_git_binary(git_binary, false, Some("test"))
    }

    pub fn new(preserve_sandbox_contents: bool, with_cmd_prefix: Option<&str>) -> Result<Self> {
        let git_binary = GitBinary::from_env()?;
        Self::with_git_binary(git_binary, preserve_sandbox_contents, with_cmd_prefix)
    }

    fn with_git_binary(
        git_binary: GitBinary,
        preserve_sandbox_contents: bool,
        with_cmd_prefix: Option<&str>,
    ) -> Result<Self> {
        let sandbox = Arc::from(
            Sandbox::new(preserve_sandbox_contents, with_cmd_prefix)
                .context("Failed to create sandbox")?,
        );
        Ok(Self {
            git_binary,
            sandbox,
        })
    }

    /// Get a reference to the Git binary that this app is using.
    pub fn git_binary(&self) -> &GitBinary {
        &self.git_binary
    }

    /// Get a reference to the app's sandbox.
    pub fn sandbox(&self) -> Arc<Sandbox> {
        self.sandbox.clone()
    }
}
