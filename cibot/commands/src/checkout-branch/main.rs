// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use cibot_commands::{
    args::normalize_args,
    entry::{self, CommonOpts},
};
use cibot_operations::{
    branch_sync, build::CMakeDriver, git::SystemGit, request::BranchCheckout,
};
use cibot_util::app::{App, ExitCode};
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "checkout-branch",
    about = "Clone or update a branch, optionally pin a commit, then build and test it"
)]
struct Opts {
    /// Branch to build
    #[clap(long = "BRANCH_NAME")]
    branch_name: String,

    /// Commit to check out after syncing the branch
    #[clap(long = "COMMIT_SHA")]
    commit_sha: Option<String>,

    /// URL to clone the repository from
    #[clap(long = "CLONE_URL")]
    clone_url: String,

    #[clap(long = "OWNER_NAME")]
    owner_name: String,

    #[clap(long = "REPO_NAME")]
    repo_name: String,

    /// Root of all working copies; defaults to the current directory
    #[clap(long = "CI_WORK_PATH", env = "CI_WORK_PATH", parse(from_os_str))]
    ci_work_path: Option<PathBuf>,

    #[clap(flatten)]
    common: CommonOpts,
}

fn run(opts: Opts, app: Arc<App>) -> Result<ExitCode> {
    let request = BranchCheckout {
        branch_name: opts.branch_name,
        commit_sha: opts.commit_sha,
        clone_url: opts.clone_url,
        owner_name: opts.owner_name,
        repo_name: opts.repo_name,
        ci_work_path: entry::resolve_ci_work_path(opts.ci_work_path)?,
    };
    let git = SystemGit::new(app.clone());
    let driver = CMakeDriver::new(app);
    branch_sync::run(&request, &git, &driver)
}

fn main() {
    let opts = Opts::parse_from(normalize_args(std::env::args_os()));
    let common = opts.common.clone();
    let ExitCode(code) = entry::run_main(&common, "checkout-branch", |app| run(opts, app));
    std::process::exit(code)
}
