// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// Returns a textual description of the current process
pub fn get_process_description() -> String {
    let cmdline = std::env::args().collect::<Vec<_>>().join(" ");
    let current_dir =
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("unknown-directory"));
    format!(
        "'{}' running in directory {:?} with PID {} started by {} on host {}",
        cmdline,
        current_dir,
        std::process::id(),
        whoami::username(),
        whoami::hostname()
    )
}
