// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Turns hosting-provider webhook deliveries into checkout requests.
//!
//! Only `push` and `pull_request` deliveries are understood. Whether a branch
//! is built at all is decided by a [`BranchPolicy`]; branches missing from the
//! policy are never built.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use cibot_util::app::ExitCode;
use serde_derive::Deserialize;
use strum_macros::{Display, EnumString};
use tracing::info;

use crate::{
    branch_sync,
    build::BuildDriver,
    git::Git,
    pr_sync,
    request::{BranchCheckout, PullRequestCheckout, DEFAULT_BASE_BRANCH},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BranchRule {
    pub name: String,
    #[serde(default)]
    pub pushes: bool,
    #[serde(default)]
    pub prs: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BranchPolicy {
    #[serde(default)]
    pub branches: Vec<BranchRule>,
}

impl BranchPolicy {
    fn rule(&self, branch_name: &str) -> Option<&BranchRule> {
        self.branches.iter().find(|rule| rule.name == branch_name)
    }

    pub fn allows_pushes(&self, branch_name: &str) -> bool {
        let allowed = self.rule(branch_name).map_or(false, |rule| rule.pushes);
        if !allowed {
            info!(
                "Processing pushes for branch <{}> isn't configured",
                branch_name
            );
        }
        allowed
    }

    pub fn allows_pull_requests(&self, branch_name: &str) -> bool {
        let allowed = self.rule(branch_name).map_or(false, |rule| rule.prs);
        if !allowed {
            info!(
                "Processing pull requests for branch <{}> isn't configured",
                branch_name
            );
        }
        allowed
    }
}

/// Dispatcher configuration, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    #[serde(alias = "CIWorkPath")]
    pub ci_work_path: PathBuf,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
    #[serde(flatten)]
    pub policy: BranchPolicy,
}

fn default_base_branch() -> String {
    DEFAULT_BASE_BRANCH.to_owned()
}

impl DispatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Reading dispatch config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Parsing dispatch config {}", path.display()))
    }
}

/// Webhook event name, as sent in the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum EventKind {
    #[strum(serialize = "push")]
    Push,
    #[strum(serialize = "pull_request")]
    PullRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub after: String,
    #[serde(default)]
    pub deleted: bool,
    pub head_commit: Option<HeadCommit>,
    pub repository: Repository,
}

impl PushEvent {
    /// Branch named by `ref`: `feature/x` for `refs/heads/feature/x`, and the
    /// last path component for anything not under `refs/heads/`.
    pub fn branch_name(&self) -> &str {
        match self.git_ref.strip_prefix("refs/heads/") {
            Some(branch_name) => branch_name,
            None => self.git_ref.rsplit('/').next().unwrap_or(&self.git_ref),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub title: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

/// What to do with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Branch {
        repo_slug: String,
        request: BranchCheckout,
    },
    PullRequest {
        repo_slug: String,
        request: PullRequestCheckout,
    },
    Skip(String),
}

/// Commit status an outcome corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CommitStatus {
    Pending,
    Success,
    Failure,
}

/// Decide what a delivery of event `event_name` with body `payload` asks for.
pub fn plan(event_name: &str, payload: &str, config: &DispatchConfig) -> Result<Dispatch> {
    let kind = match EventKind::from_str(event_name) {
        Ok(kind) => kind,
        Err(_) => return Ok(Dispatch::Skip(format!("unhandled event <{}>", event_name))),
    };

    match kind {
        EventKind::Push => {
            let event: PushEvent =
                serde_json::from_str(payload).context("Parsing push payload")?;
            plan_push(event, config)
        }
        EventKind::PullRequest => {
            let event: PullRequestEvent =
                serde_json::from_str(payload).context("Parsing pull_request payload")?;
            plan_pull_request(event, config)
        }
    }
}

fn plan_push(event: PushEvent, config: &DispatchConfig) -> Result<Dispatch> {
    if event.deleted {
        return Ok(Dispatch::Skip(format!("branch <{}> was deleted", event.git_ref)));
    }
    let branch_name = event.branch_name().to_owned();
    if !config.policy.allows_pushes(&branch_name) {
        return Ok(Dispatch::Skip(format!(
            "pushes to <{}> are not built",
            branch_name
        )));
    }
    if let Some(head_commit) = &event.head_commit {
        info!("Commit message:<{}>", head_commit.message);
    }

    Ok(Dispatch::Branch {
        repo_slug: event.repository.full_name,
        request: BranchCheckout {
            branch_name,
            commit_sha: Some(event.after),
            clone_url: event.repository.clone_url,
            owner_name: event.repository.owner.login,
            repo_name: event.repository.name,
            ci_work_path: config.ci_work_path.clone(),
        },
    })
}

fn plan_pull_request(event: PullRequestEvent, config: &DispatchConfig) -> Result<Dispatch> {
    if event.action != "opened" && event.action != "synchronize" {
        return Ok(Dispatch::Skip(format!(
            "pull request action <{}> is not built",
            event.action
        )));
    }
    let PullRequest { title, head, base } = event.pull_request;
    if !config.policy.allows_pull_requests(&base.git_ref) {
        return Ok(Dispatch::Skip(format!(
            "pull requests into <{}> are not built",
            base.git_ref
        )));
    }

    Ok(Dispatch::PullRequest {
        repo_slug: event.repository.full_name,
        request: PullRequestCheckout {
            number: event.number,
            title,
            from_branch: head.git_ref,
            from_sha: head.sha,
            to_branch: base.git_ref,
            to_sha: base.sha,
            clone_url: event.repository.clone_url,
            owner_name: event.repository.owner.login,
            repo_name: event.repository.name,
            ci_work_path: config.ci_work_path.clone(),
            base_branch: config.base_branch.clone(),
        },
    })
}

fn report_status(repo_slug: &str, commit_sha: &str, status: CommitStatus) {
    info!(repo = repo_slug, commit = commit_sha, "<{}> status", status);
}

/// Run the flow a [`Dispatch`] asks for, logging commit statuses around it.
pub fn run(dispatch: &Dispatch, git: &dyn Git, driver: &dyn BuildDriver) -> Result<ExitCode> {
    let (repo_slug, commit_sha, result) = match dispatch {
        Dispatch::Skip(reason) => {
            info!("Nothing to do: {}", reason);
            return Ok(ExitCode::SUCCESS);
        }
        Dispatch::Branch { repo_slug, request } => {
            let commit_sha = request.commit_sha.as_deref().unwrap_or_default();
            report_status(repo_slug, commit_sha, CommitStatus::Pending);
            (repo_slug, commit_sha, branch_sync::run(request, git, driver))
        }
        Dispatch::PullRequest { repo_slug, request } => {
            report_status(repo_slug, &request.from_sha, CommitStatus::Pending);
            (
                repo_slug,
                request.from_sha.as_str(),
                pr_sync::run(request, git, driver),
            )
        }
    };

    let status = if result.is_ok() {
        CommitStatus::Success
    } else {
        CommitStatus::Failure
    };
    report_status(repo_slug, commit_sha, status);
    result
}
