// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{app::App, sandbox::Sandbox};
use anyhow::{bail, Context, Result};
use std::{
    ffi::OsStr,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::{mpsc, Arc},
    thread::JoinHandle,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, debug_span, error, info, info_span};

/// An external command ran to completion but did not exit successfully.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Command [{command}] exit with code {code}")]
pub struct CommandFailed {
    pub command: String,
    pub code: i32,
}

impl CommandFailed {
    /// Find the first `CommandFailed` in an error's cause chain.
    pub fn find_in(error: &anyhow::Error) -> Option<&CommandFailed> {
        error.chain().find_map(|cause| cause.downcast_ref::<CommandFailed>())
    }
}

fn exhibit_file(file: &Path, title: &str) -> Result<()> {
    let file = File::open(file)?;
    let lines = BufReader::new(file).lines();
    error!("Begin {}", &title);
    for line in lines.flatten() {
        error!("{}", &line);
    }
    error!("End {}", &title);

    Ok(())
}

/// A command whose stdout and stderr are captured into sandbox files.
///
/// Holds the sandbox it writes into, so the files outlive every other handle
/// to the [`App`].
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    sandbox: Arc<Sandbox>,
    stdout_path: PathBuf,
    stderr_path: PathBuf,
    description_path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub enum SandboxCommandOutput {
    All,
    Stdout,
    Stderr,
    Ignore,
}

impl SandboxCommand {
    pub fn new(program: impl AsRef<OsStr>, app: Arc<App>) -> Result<(Command, Self)> {
        let mut command = Command::new(program);
        let sandbox_command = Self::with_command(&mut command, app)?;
        Ok((command, sandbox_command))
    }

    pub fn with_command(command: &mut Command, app: Arc<App>) -> Result<Self> {
        let sandbox = app.sandbox();

        // Write the description and get the generated serial to name all the files the same.
        let (_, description_path, serial) = sandbox
            .create_file(Some("sandboxed_command"), Some("script"), None)
            .context("Failed creating description file")?;

        let output_file = |extension: &str| -> Result<(Stdio, PathBuf)> {
            let (file, path, _) =
                sandbox.create_file(Some("sandboxed_command"), Some(extension), Some(serial))?;
            Ok((Stdio::from(file), path))
        };

        let (stdout, stdout_path) = output_file("stdout").context("Failed preparing stdout")?;
        let (stderr, stderr_path) = output_file("stderr").context("Failed preparing stderr")?;

        command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);

        Ok(Self {
            sandbox,
            stdout_path,
            stderr_path,
            description_path,
        })
    }

    pub fn log(&self, output: SandboxCommandOutput, description: &str) -> Result<()> {
        let title = |o: SandboxCommandOutput| format!("{:?} from {}", o, description);
        let items: Vec<(String, &Path)> = match output {
            SandboxCommandOutput::All => vec![
                (title(SandboxCommandOutput::Stdout), &self.stdout_path),
                (title(SandboxCommandOutput::Stderr), &self.stderr_path),
            ],
            SandboxCommandOutput::Stdout => {
                vec![(title(SandboxCommandOutput::Stdout), &self.stdout_path)]
            }
            SandboxCommandOutput::Stderr => {
                vec![(title(SandboxCommandOutput::Stderr), &self.stderr_path)]
            }
            SandboxCommandOutput::Ignore => vec![],
        };

        for (title, path) in items {
            exhibit_file(path, title.as_str()).with_context(|| format!("Exhibiting {}", title))?
        }

        Ok(())
    }

    pub fn read_to_string(&self, output: SandboxCommandOutput) -> Result<String> {
        let path = match output {
            SandboxCommandOutput::Stdout => &self.stdout_path,
            SandboxCommandOutput::Stderr => &self.stderr_path,
            _ => bail!("cannot read {:?} into one string", output),
        };

        let mut contents = String::new();
        BufReader::new(File::open(path)?).read_to_string(&mut contents)?;
        Ok(contents)
    }

    pub fn pretty_print_command(command: &Command) -> String {
        let convert_os_str = |s: &OsStr| -> String { s.to_string_lossy().into_owned() };

        let mut buf = convert_os_str(command.get_program());
        for arg in command.get_args() {
            buf.push(' ');
            buf.push_str(&convert_os_str(arg));
        }
        buf
    }

    /// Run the provided command; if it is not successful, log the captured
    /// `output` and fail with [`CommandFailed`].
    pub fn ensure_success_or_log(
        &self,
        cmd: &mut Command,
        output: SandboxCommandOutput,
    ) -> Result<ExitStatus> {
        let command_description = Self::pretty_print_command(cmd);
        let span = debug_span!("Running command", description = %command_description);
        let _guard = span.enter();
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.description_path)
            .with_context(|| {
                format!(
                    "Opening command description {} in sandbox {}",
                    self.description_path.display(),
                    self.sandbox.path().display()
                )
            })?;
        writeln!(file, "{}", command_description)?;

        let mut launch = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn command {}", &command_description))?;

        let tailer = Tailer::new(&command_description, &self.stderr_path);

        let status = launch
            .wait()
            .with_context(|| format!("Failed to wait for command {}", &command_description))?;
        if let Ok(tailer) = tailer {
            tailer.stop();
        }
        debug!(command = %command_description, %status, "Command exited");
        if !status.success() {
            let failure = CommandFailed {
                command: command_description.clone(),
                code: status.code().unwrap_or(1),
            };
            error!("{}", failure);
            self.log(output, &command_description)
                .context("logging output")?;
            return Err(failure.into());
        }

        Ok(status)
    }
}

/// Echoes a growing file to the log while a command runs.
struct Tailer {
    cancel_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Tailer {
    fn new(description: &str, path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Could not open {} for tailing", path.display()))?;
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let description = description.to_owned();
        let handle = std::thread::spawn(move || Self::work(description, file, cancel_rx));
        Ok(Self { cancel_tx, handle })
    }

    fn stop(self) {
        let _ = self.cancel_tx.send(());
        let _ = self.handle.join();
    }

    fn work(description: String, file: File, cancel_rx: mpsc::Receiver<()>) {
        let mut lines = BufReader::new(file).lines();
        let span = info_span!("Output", command = %description);
        let _guard = span.enter();
        loop {
            let cancelled = cancel_rx.try_recv().is_ok();
            for line in lines.by_ref().flatten() {
                info!("{}", line);
            }
            if cancelled {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}
