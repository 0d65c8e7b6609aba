// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::ops::Deref;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cibot_util::app::ExitCode;
use tracing::info;

use crate::{
    build::{self, BuildDriver, BuildPlan},
    git::Git,
    layout::CheckoutLayout,
    request::BranchCheckout,
    working_copy::{self, WorkingCopy},
};

/// Keeps a working copy on a branch, up to date with its upstream.
pub struct BranchSync<'a> {
    copy: WorkingCopy<'a>,
}

impl<'a> BranchSync<'a> {
    pub fn new(git: &'a dyn Git, path: impl Into<PathBuf>) -> Self {
        Self {
            copy: WorkingCopy::new(git, path),
        }
    }

    /// Check out `branch_name` unless it is already current, then pull and
    /// refresh submodules either way.
    pub fn switch_to_branch(&self, branch_name: &str) -> Result<()> {
        let current_branch = self.current_branch()?;
        if current_branch == branch_name {
            info!("we are already on source branch <{}>", branch_name);
        } else {
            info!(
                "switch branch from <{}> to <{}>",
                current_branch, branch_name
            );
            self.checkout_recursive(branch_name)?;
        }
        self.pull()?;
        self.update_all_submodules()
    }

    /// Move to `commit_sha` (detaching `HEAD`) unless it is already current.
    pub fn checkout_commit(&self, commit_sha: &str) -> Result<()> {
        info!("checkout commit:<{}>", commit_sha);
        let current_commit = self.current_commit()?;
        info!("current commit:<{}>", current_commit);
        if current_commit != commit_sha {
            self.copy
                .git(&["checkout", commit_sha])
                .with_context(|| format!("Checking out commit {}", commit_sha))?;
            self.update_all_submodules()?;
        }
        Ok(())
    }
}

impl<'a> Deref for BranchSync<'a> {
    type Target = WorkingCopy<'a>;

    fn deref(&self) -> &Self::Target {
        &self.copy
    }
}

/// Entry point for a push: clone if needed, sync the branch (and commit), then
/// run the branch build plan.
#[tracing::instrument(skip_all, fields(branch = %request.branch_name))]
pub fn run(
    request: &BranchCheckout,
    git: &dyn Git,
    driver: &dyn BuildDriver,
) -> Result<ExitCode> {
    request.log_summary();

    let layout = CheckoutLayout::for_branch(request);
    layout.prepare()?;
    if layout.needs_clone() {
        working_copy::clone_branch(
            git,
            layout.work_dir(),
            &request.clone_url,
            &request.branch_name,
            layout.clone_directory_name(),
        )?;
    }

    let project_root = layout.project_root();
    let sync = BranchSync::new(git, &project_root);
    sync.switch_to_branch(&request.branch_name)?;
    if let Some(commit_sha) = request.commit_sha.as_deref().filter(|s| !s.is_empty()) {
        sync.checkout_commit(commit_sha)?;
    }

    build::run_plan(driver, &BuildPlan::for_branch(), &project_root)?;
    Ok(ExitCode::SUCCESS)
}
