// Copyright 2022 Twitter, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cibot_util::{
    app::App,
    sandbox_command::{SandboxCommand, SandboxCommandOutput},
};
use strum_macros::{Display, EnumString};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Configuration {
    Debug,
    Release,
}

/// CMake generator name, passed verbatim to `cmake -G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Generator {
    Xcode,
    Ninja,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub configuration: Configuration,
    pub generator: Generator,
    /// Relative to the project root.
    pub build_dir: PathBuf,
    /// Remove the build directory before configuring.
    pub clean: bool,
}

impl BuildStep {
    fn new(
        configuration: Configuration,
        generator: Generator,
        build_dir: &[&str],
        clean: bool,
    ) -> Self {
        Self {
            configuration,
            generator,
            build_dir: build_dir.iter().collect(),
            clean,
        }
    }
}

/// Ordered configure/build/test runs for one checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    steps: Vec<BuildStep>,
}

impl BuildPlan {
    pub fn new(steps: Vec<BuildStep>) -> Self {
        Self { steps }
    }

    /// Plan for pushes. Xcode builds share one multi-config directory, and the
    /// Xcode Release build always starts from scratch.
    pub fn for_branch() -> Self {
        use Configuration::*;
        use Generator::*;
        Self::new(vec![
            BuildStep::new(Debug, Xcode, &["build", "Xcode"], false),
            BuildStep::new(Release, Xcode, &["build", "Xcode"], true),
            BuildStep::new(Debug, Ninja, &["build", "Ninja", "Debug"], false),
            BuildStep::new(Release, Ninja, &["build", "Ninja", "Release"], false),
        ])
    }

    /// Plan for pull requests: the branch plan with every step forced clean.
    pub fn for_pull_request() -> Self {
        Self::new(
            Self::for_branch()
                .steps
                .into_iter()
                .map(|step| BuildStep {
                    clean: true,
                    ..step
                })
                .collect(),
        )
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }
}

/// Configures, builds and tests a project in one build directory.
pub trait BuildDriver {
    fn configure_build_test(
        &self,
        install: bool,
        clean: bool,
        configuration: Configuration,
        generator: Generator,
        build_dir: &Path,
        project_root: &Path,
    ) -> Result<()>;
}

/// Run every step of `plan` in order, stopping at the first failure.
#[tracing::instrument(skip(driver, plan))]
pub fn run_plan(driver: &dyn BuildDriver, plan: &BuildPlan, project_root: &Path) -> Result<()> {
    for step in plan.steps() {
        let build_dir = project_root.join(&step.build_dir);
        info!(
            configuration = %step.configuration,
            generator = %step.generator,
            build_dir = %build_dir.display(),
            clean = step.clean,
            "Starting build"
        );
        driver
            .configure_build_test(
                false,
                step.clean,
                step.configuration,
                step.generator,
                &build_dir,
                project_root,
            )
            .with_context(|| {
                format!(
                    "{} {} build in {}",
                    step.generator,
                    step.configuration,
                    build_dir.display()
                )
            })?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Tool {
    #[strum(serialize = "cmake")]
    CMake,
    #[strum(serialize = "ctest")]
    CTest,
}

/// One external program run of a configure/build/test cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub cwd: PathBuf,
    pub args: Vec<OsString>,
}

/// Drives `cmake` and `ctest`.
#[derive(Debug, Clone)]
pub struct CMakeDriver {
    app: Arc<App>,
}

impl CMakeDriver {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub fn invocations(
        install: bool,
        configuration: Configuration,
        generator: Generator,
        build_dir: &Path,
        project_root: &Path,
    ) -> Vec<ToolInvocation> {
        let config = configuration.to_string();
        let cmake = |args: Vec<OsString>| ToolInvocation {
            tool: Tool::CMake,
            cwd: build_dir.to_owned(),
            args,
        };

        let mut invocations = vec![
            cmake(vec![
                "-S".into(),
                project_root.into(),
                "-B".into(),
                build_dir.into(),
                "-G".into(),
                generator.to_string().into(),
                format!("-DCMAKE_BUILD_TYPE={}", config).into(),
            ]),
            cmake(vec![
                "--build".into(),
                build_dir.into(),
                "--config".into(),
                config.clone().into(),
            ]),
            ToolInvocation {
                tool: Tool::CTest,
                cwd: build_dir.to_owned(),
                args: vec![
                    "--output-on-failure".into(),
                    "-C".into(),
                    config.clone().into(),
                ],
            },
        ];
        if install {
            invocations.push(cmake(vec![
                "--install".into(),
                build_dir.into(),
                "--config".into(),
                config.into(),
            ]));
        }
        invocations
    }

    fn run(&self, invocation: &ToolInvocation) -> Result<()> {
        let program = which::which(invocation.tool.to_string())
            .with_context(|| format!("Resolving path to {}", invocation.tool))?;
        let (mut cmd, scmd) = SandboxCommand::new(program, self.app.clone())?;
        cmd.current_dir(&invocation.cwd).args(&invocation.args);
        scmd.ensure_success_or_log(&mut cmd, SandboxCommandOutput::All)?;
        Ok(())
    }
}

/// Make sure `build_dir` exists, emptying it first when `clean` is set.
pub fn prepare_build_dir(build_dir: &Path, clean: bool) -> Result<()> {
    if clean && build_dir.exists() {
        info!(build_dir = %build_dir.display(), "Removing previous build");
        std::fs::remove_dir_all(build_dir)
            .with_context(|| format!("Removing {}", build_dir.display()))?;
    }
    std::fs::create_dir_all(build_dir)
        .with_context(|| format!("Creating {}", build_dir.display()))
}

impl BuildDriver for CMakeDriver {
    #[tracing::instrument(skip(self))]
    fn configure_build_test(
        &self,
        install: bool,
        clean: bool,
        configuration: Configuration,
        generator: Generator,
        build_dir: &Path,
        project_root: &Path,
    ) -> Result<()> {
        prepare_build_dir(build_dir, clean)?;
        for invocation in
            Self::invocations(install, configuration, generator, build_dir, project_root)
        {
            self.run(&invocation)?;
        }
        Ok(())
    }
}
