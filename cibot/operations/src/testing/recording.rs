// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use cibot_util::sandbox_command::CommandFailed;

use crate::build::{BuildDriver, Configuration, Generator};
use crate::git::Git;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCall {
    pub cwd: PathBuf,
    pub args: Vec<String>,
}

impl GitCall {
    pub fn command(&self) -> String {
        self.args.join(" ")
    }
}

/// A fake `git` that records every invocation and tracks just enough state
/// (current branch and commit) for the sync logic to make decisions.
pub struct RecordingGit {
    calls: RefCell<Vec<GitCall>>,
    branch: RefCell<String>,
    head: RefCell<String>,
    failures: RefCell<HashMap<String, i32>>,
    on_clone: RefCell<Option<PathBuf>>,
}

impl RecordingGit {
    pub fn new(branch: &str, head: &str) -> Self {
        Self {
            calls: Default::default(),
            branch: RefCell::new(branch.to_owned()),
            head: RefCell::new(head.to_owned()),
            failures: Default::default(),
            on_clone: Default::default(),
        }
    }

    /// Make the command whose arguments join to `command` exit with `code`.
    pub fn fail(&self, command: &str, code: i32) {
        self.failures.borrow_mut().insert(command.to_owned(), code);
    }

    /// Create `directory` when a clone is issued, so later steps find it.
    pub fn create_on_clone(&self, directory: &Path) {
        *self.on_clone.borrow_mut() = Some(directory.to_owned());
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(GitCall::command).collect()
    }

    pub fn count_matching(&self, prefix: &str) -> usize {
        self.commands()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl Git for RecordingGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let call = GitCall {
            cwd: cwd.to_owned(),
            args: args.iter().map(|a| a.to_string()).collect(),
        };
        let command = call.command();
        self.calls.borrow_mut().push(call);

        if let Some(code) = self.failures.borrow().get(&command) {
            return Err(CommandFailed {
                command: format!("git {}", command),
                code: *code,
            }
            .into());
        }

        let output = match args {
            ["rev-parse", "--abbrev-ref", "HEAD"] => self.branch.borrow().clone(),
            ["rev-parse", "HEAD"] => self.head.borrow().clone(),
            ["checkout", "--recurse-submodules", name] | ["checkout", "-b", name] => {
                *self.branch.borrow_mut() = name.to_string();
                String::new()
            }
            ["checkout", sha] => {
                *self.head.borrow_mut() = sha.to_string();
                *self.branch.borrow_mut() = "HEAD".to_owned();
                String::new()
            }
            ["clone", ..] => {
                if let Some(directory) = self.on_clone.borrow().as_ref() {
                    std::fs::create_dir_all(directory)?;
                }
                String::new()
            }
            _ => String::new(),
        };
        Ok(output)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCall {
    pub install: bool,
    pub clean: bool,
    pub configuration: Configuration,
    pub generator: Generator,
    pub build_dir: PathBuf,
    pub project_root: PathBuf,
}

/// A build driver that records requests instead of building.
#[derive(Default)]
pub struct RecordingDriver {
    calls: RefCell<Vec<DriverCall>>,
    fail_at: Option<usize>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Default::default()
    }

    /// Fail the `index`th (zero-based) invocation with exit code 2.
    pub fn failing_at(index: usize) -> Self {
        Self {
            calls: Default::default(),
            fail_at: Some(index),
        }
    }

    pub fn invocations(&self) -> Vec<DriverCall> {
        self.calls.borrow().clone()
    }

    /// `Generator-Configuration` labels in invocation order.
    pub fn labels(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| format!("{}-{}", c.generator, c.configuration))
            .collect()
    }
}

impl BuildDriver for RecordingDriver {
    fn configure_build_test(
        &self,
        install: bool,
        clean: bool,
        configuration: Configuration,
        generator: Generator,
        build_dir: &Path,
        project_root: &Path,
    ) -> Result<()> {
        let index = {
            let mut calls = self.calls.borrow_mut();
            calls.push(DriverCall {
                install,
                clean,
                configuration,
                generator,
                build_dir: build_dir.to_owned(),
                project_root: project_root.to_owned(),
            });
            calls.len() - 1
        };
        if self.fail_at == Some(index) {
            return Err(CommandFailed {
                command: "ctest --output-on-failure".to_owned(),
                code: 2,
            }
            .into());
        }
        Ok(())
    }
}
