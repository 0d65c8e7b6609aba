// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::request::{BranchCheckout, PullRequestCheckout};

/// Where a run lives on disk:
/// `{ci_work_path}/{owner}/{repo}/{leaf}/{repo}`, where `leaf` is the branch
/// name or `pr{number}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLayout {
    work_dir: PathBuf,
    repo_name: String,
}

impl CheckoutLayout {
    pub fn new(ci_work_path: &Path, owner_name: &str, repo_name: &str, leaf: &str) -> Self {
        Self {
            work_dir: ci_work_path.join(owner_name).join(repo_name).join(leaf),
            repo_name: repo_name.to_owned(),
        }
    }

    pub fn for_branch(request: &BranchCheckout) -> Self {
        Self::new(
            &request.ci_work_path,
            &request.owner_name,
            &request.repo_name,
            &request.branch_name,
        )
    }

    pub fn for_pull_request(request: &PullRequestCheckout) -> Self {
        Self::new(
            &request.ci_work_path,
            &request.owner_name,
            &request.repo_name,
            &format!("pr{}", request.number),
        )
    }

    /// Directory the clone is created in.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Name of the clone inside [`Self::work_dir`].
    pub fn clone_directory_name(&self) -> &str {
        &self.repo_name
    }

    pub fn project_root(&self) -> PathBuf {
        self.work_dir.join(&self.repo_name)
    }

    /// Create the work directory, including missing parents.
    pub fn prepare(&self) -> Result<()> {
        info!("path:<{}>", self.work_dir.display());
        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("Creating work directory {}", self.work_dir.display()))
    }

    /// An existing project directory is trusted as-is; its remote is not
    /// compared with the requested clone URL.
    pub fn needs_clone(&self) -> bool {
        !self.project_root().is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn branch_layout() {
        let layout = CheckoutLayout::new(Path::new("/ci"), "octo", "widgets", "release-1.0");
        assert_eq!(layout.work_dir(), Path::new("/ci/octo/widgets/release-1.0"));
        assert_eq!(
            layout.project_root(),
            PathBuf::from("/ci/octo/widgets/release-1.0/widgets")
        );
    }

    #[test]
    fn pull_request_layout_uses_pr_number() {
        let request = PullRequestCheckout {
            number: 42,
            title: String::new(),
            from_branch: "feature".to_owned(),
            from_sha: "f".to_owned(),
            to_branch: "main".to_owned(),
            to_sha: "t".to_owned(),
            clone_url: "file:///origin".to_owned(),
            owner_name: "octo".to_owned(),
            repo_name: "widgets".to_owned(),
            ci_work_path: PathBuf::from("/ci"),
            base_branch: "master".to_owned(),
        };
        let layout = CheckoutLayout::for_pull_request(&request);
        assert_eq!(
            layout.project_root(),
            PathBuf::from("/ci/octo/widgets/pr42/widgets")
        );
    }

    #[test]
    fn prepare_is_idempotent_and_detects_existing_clone() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layout = CheckoutLayout::new(dir.path(), "octo", "widgets", "main");
        layout.prepare()?;
        layout.prepare()?;
        assert!(layout.work_dir().is_dir());
        assert!(layout.needs_clone());

        std::fs::create_dir(layout.project_root())?;
        assert!(!layout.needs_clone());
        Ok(())
    }
}
