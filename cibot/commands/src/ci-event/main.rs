// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cibot_commands::{
    args::normalize_args,
    entry::{self, CommonOpts},
};
use cibot_operations::{
    build::CMakeDriver,
    event::{self, DispatchConfig},
    git::SystemGit,
};
use cibot_util::app::{App, ExitCode};
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "ci-event",
    about = "Build whatever a push or pull_request webhook delivery asks for"
)]
struct Opts {
    /// Event name, e.g. `push` or `pull_request`
    #[clap(long = "EVENT")]
    event: String,

    /// File holding the delivery's JSON body
    #[clap(long = "PAYLOAD", parse(from_os_str))]
    payload: PathBuf,

    /// JSON file with the work path and the per-branch policy
    #[clap(long = "CONFIG", parse(from_os_str))]
    config: PathBuf,

    #[clap(flatten)]
    common: CommonOpts,
}

fn run(opts: Opts, app: Arc<App>) -> Result<ExitCode> {
    let config = DispatchConfig::load(&opts.config)?;
    let payload = std::fs::read_to_string(&opts.payload)
        .with_context(|| format!("Reading payload {}", opts.payload.display()))?;
    let dispatch = event::plan(&opts.event, &payload, &config)?;

    let git = SystemGit::new(app.clone());
    let driver = CMakeDriver::new(app);
    event::run(&dispatch, &git, &driver)
}

fn main() {
    let opts = Opts::parse_from(normalize_args(std::env::args_os()));
    let common = opts.common.clone();
    let ExitCode(code) = entry::run_main(&common, "ci-event", |app| run(opts, app));
    std::process::exit(code)
}
