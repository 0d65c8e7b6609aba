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
    build::CMakeDriver,
    git::SystemGit,
    pr_sync,
    request::{PullRequestCheckout, DEFAULT_BASE_BRANCH},
};
use cibot_util::app::{App, ExitCode};
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "checkout-pr",
    about = "Fetch a pull request's head into a working copy, then build and test it"
)]
struct Opts {
    #[clap(long = "PR_TITLE")]
    pr_title: String,

    /// Branch the pull request comes from
    #[clap(long = "FROM_BRANCH")]
    from_branch: String,

    #[clap(long = "FROM_SHA")]
    from_sha: String,

    /// Branch the pull request merges into
    #[clap(long = "TO_BRANCH")]
    to_branch: String,

    #[clap(long = "TO_SHA")]
    to_sha: String,

    /// URL to clone the repository from
    #[clap(long = "CLONE_URL")]
    clone_url: String,

    #[clap(long = "OWNER_NAME")]
    owner_name: String,

    #[clap(long = "REPO_NAME")]
    repo_name: String,

    #[clap(long = "PR_NUMBER")]
    pr_number: u64,

    /// Root of all working copies; defaults to the current directory
    #[clap(long = "CI_WORK_PATH", env = "CI_WORK_PATH", parse(from_os_str))]
    ci_work_path: Option<PathBuf>,

    /// Branch the working copy is reset to before fetching
    #[clap(long = "BASE_BRANCH", default_value = DEFAULT_BASE_BRANCH)]
    base_branch: String,

    #[clap(flatten)]
    common: CommonOpts,
}

fn run(opts: Opts, app: Arc<App>) -> Result<ExitCode> {
    let request = PullRequestCheckout {
        number: opts.pr_number,
        title: opts.pr_title,
        from_branch: opts.from_branch,
        from_sha: opts.from_sha,
        to_branch: opts.to_branch,
        to_sha: opts.to_sha,
        clone_url: opts.clone_url,
        owner_name: opts.owner_name,
        repo_name: opts.repo_name,
        ci_work_path: entry::resolve_ci_work_path(opts.ci_work_path)?,
        base_branch: opts.base_branch,
    };
    let git = SystemGit::new(app.clone());
    let driver = CMakeDriver::new(app);
    pr_sync::run(&request, &git, &driver)
}

fn main() {
    let opts = Opts::parse_from(normalize_args(std::env::args_os()));
    let common = opts.common.clone();
    let ExitCode(code) = entry::run_main(&common, "checkout-pr", |app| run(opts, app));
    std::process::exit(code)
}
