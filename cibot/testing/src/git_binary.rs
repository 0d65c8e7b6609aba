// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tempfile::TempDir;

/// A resolved `git` executable.
///
/// Instances created with [`GitBinary::for_testing`] run every command with a
/// scrubbed environment: a throwaway `HOME` and a fixed author/committer
/// identity, so fixtures never read the invoking user's configuration.
#[derive(Clone, Debug)]
pub struct GitBinary {
    pub git_binary_path: PathBuf,
    pub git_exec_path: PathBuf,
    home_temp_dir: Option<Arc<TempDir>>,
}

impl PartialEq for GitBinary {
    fn eq(&self, other: &Self) -> bool {
        self.git_binary_path == other.git_binary_path && self.git_exec_path == other.git_exec_path
    }
}

impl Eq for GitBinary {}

impl GitBinary {
    pub fn from_env() -> Result<Self> {
        let git_binary_path =
            which::which("git").context("Resolving absolute path for git binary")?;
        Self::from_binary_path(git_binary_path)
    }

    pub fn from_binary_path(git_binary_path: PathBuf) -> Result<Self> {
        let git_exec_path = git_exec_path(&git_binary_path)?;
        Ok(Self {
            git_binary_path,
            git_exec_path,
            home_temp_dir: None,
        })
    }

    pub fn for_testing() -> Result<Self> {
        let mut binary = Self::from_env()?;
        binary.home_temp_dir = Some(Arc::new(
            tempfile::tempdir().context("creating temporary HOME for git")?,
        ));
        Ok(binary)
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.git_binary_path);
        if let Some(home) = &self.home_temp_dir {
            command.env_clear();
            if let Some(path) = std::env::var_os("PATH") {
                command.env("PATH", path);
            }
            command.env("HOME", home.path());
            command.env("GIT_EXEC_PATH", &self.git_exec_path);
            command.env("GIT_CONFIG_NOSYSTEM", "1");
            command.env("GIT_AUTHOR_NAME", "CI Testing");
            command.env("GIT_AUTHOR_EMAIL", "ci@example.com");
            command.env("GIT_COMMITTER_NAME", "CI Testing");
            command.env("GIT_COMMITTER_EMAIL", "ci@example.com");
        }
        command
    }
}

fn git_exec_path(git_binary_path: &Path) -> Result<PathBuf> {
    let output = Command::new(git_binary_path)
        .arg("--exec-path")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("running git --exec-path")?;

    if !output.status.success() {
        bail!("git --exec-path failed to run");
    }

    let stdout = String::from_utf8(output.stdout).context("git --exec-path emitted non-UTF-8")?;
    Ok(PathBuf::from(stdout.trim_end_matches(&['\r', '\n'][..])).canonicalize()?)
}
