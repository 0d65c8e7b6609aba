// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use cibot_testing::{init_logging, ScratchGitRepo};
use cibot_util::{
    app::{App, ExitCode},
    sandbox_command::CommandFailed,
};

use crate::{
    branch_sync,
    git::{Git, SystemGit},
    layout::CheckoutLayout,
    pr_sync,
    request::{BranchCheckout, PullRequestCheckout},
    testing::recording::RecordingDriver,
};

/// An origin repository plus an empty CI work path.
struct Fixture {
    _dir: TempDir,
    origin: ScratchGitRepo,
    ci_work_path: PathBuf,
    git: SystemGit,
}

impl Fixture {
    fn new(branch: &str) -> Result<Self> {
        init_logging();
        let dir = TempDir::new()?;
        let origin_parent = dir.path().join("origin");
        std::fs::create_dir_all(&origin_parent)?;
        let origin = ScratchGitRepo::new_static_fixture(&origin_parent, branch)?;
        let ci_work_path = dir.path().join("ci");
        let git = SystemGit::new(Arc::new(App::new_for_testing()?));
        Ok(Self {
            _dir: dir,
            origin,
            ci_work_path,
            git,
        })
    }

    fn branch_request(&self, branch_name: &str, commit_sha: Option<String>) -> BranchCheckout {
        BranchCheckout {
            branch_name: branch_name.to_owned(),
            commit_sha,
            clone_url: self.origin.clone_url(),
            owner_name: "octo".to_owned(),
            repo_name: "widgets".to_owned(),
            ci_work_path: self.ci_work_path.clone(),
        }
    }

    fn head_of(&self, project_root: &std::path::Path) -> Result<String> {
        self.git.run(project_root, &["rev-parse", "HEAD"])
    }

    fn branch_of(&self, project_root: &std::path::Path) -> Result<String> {
        self.git
            .run(project_root, &["rev-parse", "--abbrev-ref", "HEAD"])
    }
}

#[test]
fn branch_run_clones_then_pulls_on_rerun() -> Result<()> {
    let fixture = Fixture::new("release-1.0")?;
    let request = fixture.branch_request("release-1.0", None);
    let project_root = CheckoutLayout::for_branch(&request).project_root();

    let driver = RecordingDriver::new();
    assert_eq!(branch_sync::run(&request, &fixture.git, &driver)?, ExitCode::SUCCESS);
    assert!(project_root.join("CMakeLists.txt").is_file());
    assert_eq!(fixture.branch_of(&project_root)?, "release-1.0");
    assert_eq!(fixture.head_of(&project_root)?, fixture.origin.head_commit()?);
    assert_eq!(
        driver.labels(),
        vec!["Xcode-Debug", "Xcode-Release", "Ninja-Debug", "Ninja-Release"]
    );

    let new_head = fixture
        .origin
        .write_and_commit_file("NEWS", "second", "Second commit")?;
    let driver = RecordingDriver::new();
    assert_eq!(branch_sync::run(&request, &fixture.git, &driver)?, ExitCode::SUCCESS);
    assert_eq!(fixture.head_of(&project_root)?, new_head);
    assert_eq!(driver.invocations().len(), 4);
    Ok(())
}

#[test]
fn branch_run_pins_requested_commit() -> Result<()> {
    let fixture = Fixture::new("main")?;
    let first = fixture.origin.head_commit()?;
    fixture
        .origin
        .write_and_commit_file("NEWS", "second", "Second commit")?;
    let request = fixture.branch_request("main", Some(first.clone()));
    let project_root = CheckoutLayout::for_branch(&request).project_root();

    assert_eq!(
        branch_sync::run(&request, &fixture.git, &RecordingDriver::new())?,
        ExitCode::SUCCESS
    );
    assert_eq!(fixture.head_of(&project_root)?, first);

    // A detached checkout goes back to the branch on the next run.
    let latest = fixture.branch_request("main", None);
    assert_eq!(
        branch_sync::run(&latest, &fixture.git, &RecordingDriver::new())?,
        ExitCode::SUCCESS
    );
    assert_eq!(fixture.branch_of(&project_root)?, "main");
    assert_eq!(fixture.head_of(&project_root)?, fixture.origin.head_commit()?);
    Ok(())
}

#[test]
fn pull_request_run_fetches_head_ref() -> Result<()> {
    let fixture = Fixture::new("master")?;
    fixture.origin.create_and_switch_to_branch("feature")?;
    let feature_head = fixture
        .origin
        .write_and_commit_file("feature.txt", "feature", "Add feature")?;
    fixture
        .origin
        .update_ref("refs/pull/42/head", &feature_head)?;
    fixture.origin.switch_to_branch("master")?;

    let request = PullRequestCheckout {
        number: 42,
        title: "Add feature".to_owned(),
        from_branch: "feature".to_owned(),
        from_sha: feature_head.clone(),
        to_branch: "master".to_owned(),
        to_sha: fixture.origin.head_commit()?,
        clone_url: fixture.origin.clone_url(),
        owner_name: "octo".to_owned(),
        repo_name: "widgets".to_owned(),
        ci_work_path: fixture.ci_work_path.clone(),
        base_branch: "master".to_owned(),
    };
    let project_root = CheckoutLayout::for_pull_request(&request).project_root();

    let driver = RecordingDriver::new();
    assert_eq!(pr_sync::run(&request, &fixture.git, &driver)?, ExitCode::SUCCESS);

    assert!(project_root.ends_with("octo/widgets/pr42/widgets"));
    assert_eq!(fixture.branch_of(&project_root)?, "pr42_feature_master");
    assert_eq!(fixture.head_of(&project_root)?, feature_head);
    assert!(driver.invocations().iter().all(|c| c.clean));
    Ok(())
}

#[test]
fn unreachable_origin_fails_with_git_exit_code() -> Result<()> {
    let fixture = Fixture::new("main")?;
    let mut request = fixture.branch_request("main", None);
    request.clone_url = format!("file://{}", fixture.ci_work_path.join("missing").display());

    let driver = RecordingDriver::new();
    let err = branch_sync::run(&request, &fixture.git, &driver).unwrap_err();

    let failure = CommandFailed::find_in(&err).expect("expected a CommandFailed");
    assert_eq!(failure.code, 128);
    assert!(failure.command.contains("clone"));
    assert!(driver.invocations().is_empty());
    Ok(())
}
