// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::ops::Deref;
use std::path::PathBuf;

use anyhow::Result;
use cibot_util::app::ExitCode;
use tracing::info;

use crate::{
    build::{self, BuildDriver, BuildPlan},
    git::Git,
    layout::CheckoutLayout,
    request::PullRequestCheckout,
    working_copy::{self, WorkingCopy, DEFAULT_REMOTE},
};

/// Name of the local branch a pull request's head is fetched into.
pub fn pull_request_branch_name(number: u64, from_branch: &str, to_branch: &str) -> String {
    format!("pr{}_{}_{}", number, from_branch, to_branch)
}

/// Brings pull-request heads into a working copy.
pub struct PullRequestSync<'a> {
    copy: WorkingCopy<'a>,
}

impl<'a> PullRequestSync<'a> {
    pub fn new(git: &'a dyn Git, path: impl Into<PathBuf>) -> Self {
        Self {
            copy: WorkingCopy::new(git, path),
        }
    }

    /// Check out `branch_name` and refresh submodules, unless it is already
    /// current. Nothing is pulled: fetched pull-request branches have no upstream.
    pub fn switch_to_branch(&self, branch_name: &str) -> Result<()> {
        let current_branch = self.current_branch()?;
        if current_branch == branch_name {
            info!("we are already on source branch <{}>", branch_name);
            return Ok(());
        }
        info!(
            "switch branch from <{}> to <{}>",
            current_branch, branch_name
        );
        self.checkout_recursive(branch_name)?;
        self.update_all_submodules()
    }

    /// Fetch the head of pull request `number` into a new local branch and
    /// return that branch's name. An existing branch of the same name that
    /// cannot be fast-forwarded makes the fetch, and therefore the run, fail.
    pub fn checkout_pull_request(
        &self,
        number: u64,
        from_branch: &str,
        to_branch: &str,
        to_sha: &str,
    ) -> Result<String> {
        let pr_branch_name = pull_request_branch_name(number, from_branch, to_branch);
        info!(to_sha, "checkout_pr to branch:<{}>", pr_branch_name);
        self.fetch(
            DEFAULT_REMOTE,
            &format!("pull/{}/head:{}", number, pr_branch_name),
        )?;
        Ok(pr_branch_name)
    }
}

impl<'a> Deref for PullRequestSync<'a> {
    type Target = WorkingCopy<'a>;

    fn deref(&self) -> &Self::Target {
        &self.copy
    }
}

/// Entry point for a pull request: clone if needed, start from the base
/// branch, fetch and switch to the pull-request branch, then run the
/// pull-request build plan.
#[tracing::instrument(skip_all, fields(pr = request.number))]
pub fn run(
    request: &PullRequestCheckout,
    git: &dyn Git,
    driver: &dyn BuildDriver,
) -> Result<ExitCode> {
    request.log_summary();

    let layout = CheckoutLayout::for_pull_request(request);
    layout.prepare()?;
    if layout.needs_clone() {
        working_copy::clone_repo(
            git,
            layout.work_dir(),
            &request.clone_url,
            layout.clone_directory_name(),
        )?;
    }

    let project_root = layout.project_root();
    let sync = PullRequestSync::new(git, &project_root);
    sync.switch_to_branch(&request.base_branch)?;
    let pr_branch_name = sync.checkout_pull_request(
        request.number,
        &request.from_branch,
        &request.to_branch,
        &request.to_sha,
    )?;
    sync.switch_to_branch(&pr_branch_name)?;

    build::run_plan(driver, &BuildPlan::for_pull_request(), &project_root)?;
    Ok(ExitCode::SUCCESS)
}
