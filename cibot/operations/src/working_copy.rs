// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::git::Git;

/// Branch every submodule is assumed to track.
///
/// Submodules whose integration branch has another name are not supported:
/// `git checkout master` fails inside them and the run aborts.
pub const SUBMODULE_TRACKING_BRANCH: &str = "master";

pub const DEFAULT_REMOTE: &str = "origin";

/// Git operations on one local checkout, addressed by path rather than by the
/// process's current directory.
pub struct WorkingCopy<'a> {
    git: &'a dyn Git,
    path: PathBuf,
}

impl<'a> WorkingCopy<'a> {
    pub fn new(git: &'a dyn Git, path: impl Into<PathBuf>) -> Self {
        Self {
            git,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn git(&self, args: &[&str]) -> Result<String> {
        self.git.run(&self.path, args)
    }

    pub fn current_branch(&self) -> Result<String> {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
            .context("Determining the current branch")
    }

    pub fn current_commit(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"])
            .context("Determining the current commit")
    }

    pub fn checkout_recursive(&self, refname: &str) -> Result<()> {
        self.git(&["checkout", "--recurse-submodules", refname])
            .with_context(|| format!("Checking out {}", refname))?;
        Ok(())
    }

    pub fn pull(&self) -> Result<()> {
        self.git(&["pull"]).context("Pulling latest changes")?;
        Ok(())
    }

    /// Put every submodule on its tracking branch, then initialize and update
    /// them recursively.
    pub fn update_all_submodules(&self) -> Result<()> {
        self.git(&[
            "submodule",
            "foreach",
            "--recursive",
            "git",
            "checkout",
            SUBMODULE_TRACKING_BRANCH,
        ])
        .context("Checking out submodule tracking branches")?;
        self.git(&["submodule", "update", "--init", "--recursive"])
            .context("Updating submodules")?;
        Ok(())
    }

    pub fn create_and_checkout_branch(&self, branch_name: &str) -> Result<()> {
        info!("create and checkout branch <{}>", branch_name);
        self.git(&["checkout", "-b", branch_name])
            .with_context(|| format!("Creating branch {}", branch_name))?;
        Ok(())
    }

    pub fn merge_branch_to_current(&self, branch_name: &str) -> Result<()> {
        let current_branch = self.current_branch()?;
        info!("merge <{}> to <{}>", branch_name, current_branch);
        self.git(&["merge", branch_name])
            .with_context(|| format!("Merging {} into {}", branch_name, current_branch))?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str, refspec: &str) -> Result<()> {
        self.git(&["fetch", remote, refspec])
            .with_context(|| format!("Fetching {} from {}", refspec, remote))?;
        Ok(())
    }
}

/// Clone only `branch_name` of `clone_url` into `parent/directory`.
pub fn clone_branch(
    git: &dyn Git,
    parent: &Path,
    clone_url: &str,
    branch_name: &str,
    directory: &str,
) -> Result<()> {
    info!("clone branch <{}> from <{}>", branch_name, clone_url);
    git.run(
        parent,
        &["clone", "-b", branch_name, "--single-branch", clone_url, directory],
    )
    .with_context(|| format!("Cloning {} from {}", branch_name, clone_url))?;
    Ok(())
}

/// Clone `clone_url` into `parent/directory`.
pub fn clone_repo(git: &dyn Git, parent: &Path, clone_url: &str, directory: &str) -> Result<()> {
    info!("clone from:<{}>", clone_url);
    git.run(parent, &["clone", clone_url, directory])
        .with_context(|| format!("Cloning {}", clone_url))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::recording::RecordingGit;
    use anyhow::Result;

    #[test]
    fn submodules_are_checked_out_before_update() -> Result<()> {
        let git = RecordingGit::new("main", "abc");
        let copy = WorkingCopy::new(&git, "/ci/repo");
        copy.update_all_submodules()?;
        assert_eq!(
            git.commands(),
            vec![
                "submodule foreach --recursive git checkout master",
                "submodule update --init --recursive",
            ]
        );
        Ok(())
    }

    #[test]
    fn merge_names_current_branch() -> Result<()> {
        let git = RecordingGit::new("release", "abc");
        let copy = WorkingCopy::new(&git, "/ci/repo");
        copy.create_and_checkout_branch("integration")?;
        copy.merge_branch_to_current("feature")?;
        assert_eq!(
            git.commands(),
            vec![
                "checkout -b integration",
                "rev-parse --abbrev-ref HEAD",
                "merge feature",
            ]
        );
        assert_eq!(copy.current_branch()?, "integration");
        Ok(())
    }

    #[test]
    fn clones_run_in_parent_directory() -> Result<()> {
        let git = RecordingGit::new("main", "abc");
        clone_branch(&git, Path::new("/ci/o/r/main"), "file:///origin", "main", "r")?;
        clone_repo(&git, Path::new("/ci/o/r/pr3"), "file:///origin", "r")?;
        let calls = git.calls();
        assert_eq!(calls[0].cwd, PathBuf::from("/ci/o/r/main"));
        assert_eq!(
            calls[0].command(),
            "clone -b main --single-branch file:///origin r"
        );
        assert_eq!(calls[1].cwd, PathBuf::from("/ci/o/r/pr3"));
        assert_eq!(calls[1].command(), "clone file:///origin r");
        Ok(())
    }
}
