// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::GitBinary;
use anyhow::{bail, Context, Result};
use git2::Repository;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use uuid::Uuid;

/// A throwaway repository used as a stand-in for a hosted origin.
pub struct ScratchGitRepo {
    git_binary: GitBinary,
    path: PathBuf,
}

impl ScratchGitRepo {
    // Create a new fixture repo with a unique random name in the given directory,
    // with one commit on `branch`.
    pub fn new_static_fixture(containing_dir: &Path, branch: &str) -> Result<Self> {
        let git_binary = GitBinary::for_testing()?;
        let name = format!("repo_{}", Uuid::new_v4());
        let path = containing_dir.join(&name);
        std::fs::create_dir_all(&path).context("creating fixture directory")?;

        let instance = Self { git_binary, path };
        instance.git(["init", "--quiet"])?;
        instance.git(["config", "user.email", "example@example.com"])?;
        instance.git(["config", "user.name", "Example"])?;
        instance.git(["checkout", "--quiet", "-b", branch])?;
        instance.write_file("CMakeLists.txt", "cmake_minimum_required(VERSION 3.16)\n")?;
        instance.write_file("src/main.c", "int main(void) { return 0; }\n")?;
        instance.git(["add", "--", "."])?;
        instance.git(["commit", "--quiet", "-m", "Initial import"])?;

        Ok(instance)
    }

    /// The URL other repositories should use to clone this one.
    pub fn clone_url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    pub fn create_and_switch_to_branch(&self, name: &str) -> Result<()> {
        self.git(["switch", "--quiet", "-c", name])
            .with_context(|| format!("switching to new branch {}", name))
    }

    pub fn switch_to_branch(&self, name: &str) -> Result<()> {
        self.git(["switch", "--quiet", name])
            .with_context(|| format!("switching to branch {}", name))
    }

    /// Point `refname` at `target`, e.g. to publish `refs/pull/7/head`.
    pub fn update_ref(&self, refname: &str, target: &str) -> Result<()> {
        self.git(["update-ref", refname, target])
    }

    pub fn head_commit(&self) -> Result<String> {
        let repo = self.repo()?;
        let id = repo
            .head()
            .context("reading HEAD reference")?
            .peel_to_commit()
            .context("finding commit")?
            .id();
        Ok(id.to_string())
    }

    pub fn write_file(
        &self,
        relative_filename: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<()> {
        let absolute_filename = self.path.join(relative_filename.as_ref());
        if let Some(parent_dir) = absolute_filename.parent() {
            std::fs::create_dir_all(parent_dir).context("creating intermediate directories")?;
        }
        std::fs::write(&absolute_filename, content).context("writing content")?;
        Ok(())
    }

    pub fn write_and_commit_file(
        &self,
        relative_filename: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        message: impl AsRef<str>,
    ) -> Result<String> {
        let relative_filename = relative_filename.as_ref();
        self.write_file(relative_filename, content)?;
        self.git([OsStr::new("add"), OsStr::new("--"), relative_filename.as_os_str()])?;
        self.git(["commit", "--quiet", "-m", message.as_ref()])?;
        self.head_commit()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repo(&self) -> Result<Repository> {
        Repository::open(&self.path).context("opening repository")
    }

    fn git<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command: Command = self.git_binary.command();
        command.current_dir(&self.path).args(args);
        let status = command
            .status()
            .with_context(|| format!("spawning git in {}", self.path.display()))?;
        if !status.success() {
            bail!("git exited with {} in {}", status, self.path.display());
        }
        Ok(())
    }
}
