// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use tempfile::TempDir;

use crate::{paths, process};

/// Per-run directory holding the captured stdout/stderr of every external
/// command. Removed on drop unless the contents are preserved.
#[derive(Debug)]
pub struct Sandbox {
    #[allow(dead_code)]
    temp_dir: Option<TempDir>,
    path: PathBuf,
    serial_sequence: AtomicUsize,
}

const DEFAULT_NAME_PREFIX: &str = "cibot_sandbox_";

impl Sandbox {
    pub fn new(preserve_contents: bool, name_prefix: Option<&str>) -> Result<Self> {
        Self::new_in(&paths::cibot_sandbox_dir(), preserve_contents, name_prefix)
    }

    pub fn new_in(
        sandbox_root: &Path,
        preserve_contents: bool,
        name_prefix: Option<&str>,
    ) -> Result<Self> {
        fs::create_dir_all(sandbox_root)
            .with_context(|| format!("creating sandbox root {}", sandbox_root.display()))?;
        let prefix = name_prefix
            .map(|prefix| DEFAULT_NAME_PREFIX.to_string() + prefix + "_")
            .unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string());
        let underlying: TempDir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(sandbox_root)
            .context("creating a temporary directory to house the sandbox")?;

        let path = underlying.path().to_owned();
        let temp_dir = if preserve_contents {
            // Keep the directory by releasing it from the TempDir's ownership.
            let path = underlying.into_path();
            info!(?path, "Created sandbox, which will not be cleaned up at exit");
            Self::create_latest_symlink(&path, sandbox_root, &prefix);
            None
        } else {
            Some(underlying)
        };

        let instance = Self {
            temp_dir,
            path,
            serial_sequence: AtomicUsize::new(0),
        };

        fs::write(
            instance.command_description_path(),
            process::get_process_description(),
        )
        .context("Writing process description failed")?;

        Ok(instance)
    }

    pub fn command_description_path(&self) -> PathBuf {
        self.path.join("cmd")
    }

    fn latest_symlink_path(sandbox_root: &Path, prefix: &str) -> PathBuf {
        sandbox_root
            .join(prefix.trim_end_matches('_'))
            .with_extension("latest")
    }

    #[cfg(unix)]
    fn create_latest_symlink(path: &Path, root: &Path, prefix: &str) {
        let link_path = Self::latest_symlink_path(root, prefix);
        if link_path.is_symlink() {
            let _ = fs::remove_file(&link_path);
        }
        if let Err(e) = std::os::unix::fs::symlink(path, link_path) {
            warn!(?e, "Failed to create symlink to latest sandbox");
        }
    }

    #[cfg(not(unix))]
    fn create_latest_symlink(_path: &Path, _root: &Path, _prefix: &str) {}

    /// Create a file named `{prefix}-{serial}.{extension}`.
    ///
    /// Passing the serial of an earlier file groups related files (e.g. the
    /// stdout and stderr of one command) under the same number.
    pub fn create_file(
        &self,
        prefix: Option<&str>,
        extension: Option<&str>,
        serial: Option<usize>,
    ) -> Result<(File, PathBuf, usize)> {
        let serial: usize =
            serial.unwrap_or_else(|| self.serial_sequence.fetch_add(1, Ordering::SeqCst));
        let mut path = PathBuf::from(format!("{}-{:09}", prefix.unwrap_or("unknown"), serial));
        if let Some(extension) = extension {
            path.set_extension(extension);
        }
        let qualified_path = self.path.join(path);
        let file = File::create(&qualified_path).context("creating a sandbox file")?;

        Ok((file, qualified_path, serial))
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::ffi::OsStr;

    #[test]
    fn sandbox_deletion() -> Result<()> {
        let root = tempfile::tempdir()?;
        let path = {
            let sandbox = Sandbox::new_in(root.path(), false, None)?;
            sandbox.path().to_owned()
        };
        assert!(fs::metadata(path).is_err());
        Ok(())
    }

    #[test]
    fn sandbox_preservation() -> Result<()> {
        let root = tempfile::tempdir()?;
        let sandbox = Sandbox::new_in(root.path(), true, None)?;
        let path = sandbox.path().to_owned();
        drop(sandbox);
        assert!(fs::metadata(&path)?.is_dir());

        let metadata = fs::symlink_metadata(root.path().join("cibot_sandbox.latest"))?;
        assert!(metadata.is_symlink());
        Ok(())
    }

    #[test]
    fn file_naming() -> Result<()> {
        let root = tempfile::tempdir()?;
        let sandbox = Sandbox::new_in(root.path(), false, Some("naming"))?;

        let (_, path, serial) = sandbox.create_file(Some("hello"), Some("txt"), None)?;
        assert_eq!(serial, 0);
        assert_eq!(path.file_name(), Some(OsStr::new("hello-000000000.txt")));

        let (_, path, serial) = sandbox.create_file(None, None, None)?;
        assert_eq!(serial, 1);
        assert_eq!(path.file_name(), Some(OsStr::new("unknown-000000001")));

        let (_, path, serial) = sandbox.create_file(Some("hello"), Some("stderr"), Some(0))?;
        assert_eq!(serial, 0);
        assert_eq!(path.file_name(), Some(OsStr::new("hello-000000000.stderr")));
        Ok(())
    }

    #[test]
    fn writing_command_description() -> Result<()> {
        let root = tempfile::tempdir()?;
        let sandbox = Sandbox::new_in(root.path(), false, None)?;
        let contents = fs::read_to_string(sandbox.command_description_path())?;
        assert!(contents.contains("with PID"));
        Ok(())
    }
}
