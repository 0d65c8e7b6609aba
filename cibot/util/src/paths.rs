// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

#[cfg(not(target_os = "macos"))]
pub fn cibot_sandbox_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cibot")
        .join("sandboxes")
}

#[cfg(target_os = "macos")]
pub fn cibot_sandbox_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Library").join("Logs"))
        .unwrap_or_else(std::env::temp_dir)
        .join("cibot")
        .join("sandboxes")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde<P: AsRef<Path>>(path_user_input: P) -> Result<PathBuf> {
    let p = path_user_input.as_ref();
    if !p.starts_with("~") {
        return Ok(p.to_path_buf());
    }

    let home_dir = match dirs::home_dir() {
        Some(home_dir) => home_dir,
        None => bail!("Could not determine home directory"),
    };

    // `starts_with` matched, so there is always a prefix to strip.
    let rest = p.strip_prefix("~").unwrap_or(p);
    if rest.as_os_str().is_empty() {
        Ok(home_dir)
    } else {
        Ok(home_dir.join(rest))
    }
}
