// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use tracing::info;

/// Base branch a pull-request run starts from unless told otherwise.
pub const DEFAULT_BASE_BRANCH: &str = "master";

/// Build a pushed branch, optionally pinned to one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCheckout {
    pub branch_name: String,
    pub commit_sha: Option<String>,
    pub clone_url: String,
    pub owner_name: String,
    pub repo_name: String,
    pub ci_work_path: PathBuf,
}

impl BranchCheckout {
    pub fn log_summary(&self) {
        info!(
            "push on branch:<{}> with commit sha:<{}>",
            self.branch_name,
            self.commit_sha.as_deref().unwrap_or("")
        );
        log_repository(
            &self.clone_url,
            &self.repo_name,
            &self.owner_name,
            &self.ci_work_path,
        );
    }
}

/// Build the head of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestCheckout {
    pub number: u64,
    pub title: String,
    pub from_branch: String,
    pub from_sha: String,
    pub to_branch: String,
    pub to_sha: String,
    pub clone_url: String,
    pub owner_name: String,
    pub repo_name: String,
    pub ci_work_path: PathBuf,
    /// Branch checked out before the pull-request ref is fetched.
    pub base_branch: String,
}

impl PullRequestCheckout {
    pub fn log_summary(&self) {
        info!(
            "pull request <{}> FROM_BRANCH:<{}> to TO_BRANCH:<{}>",
            self.number, self.from_branch, self.to_branch
        );
        info!("FROM_SHA:<{}> to TO_SHA:<{}>", self.from_sha, self.to_sha);
        if !self.title.is_empty() {
            info!("PR_TITLE:<{}>", self.title);
        }
        log_repository(
            &self.clone_url,
            &self.repo_name,
            &self.owner_name,
            &self.ci_work_path,
        );
    }
}

fn log_repository(clone_url: &str, repo_name: &str, owner_name: &str, ci_work_path: &Path) {
    info!("CLONE_URL:<{}>", clone_url);
    info!("REPO_NAME:<{}>", repo_name);
    info!("OWNER_NAME:<{}>", owner_name);
    info!("CI_WORK_PATH:<{}>", ci_work_path.display());
}
