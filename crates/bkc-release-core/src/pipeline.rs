//! The release run: detect → resolve → select/bootstrap → build → package.
//!
//! Every step runs to completion before the next one starts and the first
//! error aborts the run.

use std::path::{Path, PathBuf};

use crate::build::{self, BuildInvoker};
use crate::config::ReleaseConfig;
use crate::environment::{BuildEnvironment, EnvironmentBootstrapper};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::package::{self, ArchiveSpec, Packager};
use crate::platform::{OsFamily, PlatformDescriptor};
use crate::toolchain::{ToolchainSelection, ToolchainSelector};
use crate::version::resolve_version;

/// Steps reported while a release runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchSubmodules,
    SelectToolchain,
    BootstrapEnvironment,
    Clean,
    Build,
    Package,
    FinalClean,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::FetchSubmodules => "Fetching submodules",
            Step::SelectToolchain => "Selecting compilers",
            Step::BootstrapEnvironment => "Initialising Visual Studio environment",
            Step::Clean => "Cleaning",
            Step::Build => "Building",
            Step::Package => "Packaging",
            Step::FinalClean => "Cleaning up",
        }
    }
}

/// Progress notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseEvent {
    /// Platform and version are known.
    Started {
        version: String,
        platform: PlatformDescriptor,
        platform_tag: &'static str,
    },
    StepStarted(Step),
    StepFinished(Step),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub platform: PlatformDescriptor,
    pub version: String,
    pub platform_tag: &'static str,
    pub toolchain: Option<ToolchainSelection>,
    pub archive: PathBuf,
}

/// Sequential release builder for one project root.
pub struct ReleasePipeline<'a> {
    runner: &'a dyn CommandRunner,
    root: PathBuf,
    output_dir: Option<PathBuf>,
    config: ReleaseConfig,
    fetch_submodules: bool,
    platform: Option<PlatformDescriptor>,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        root: impl AsRef<Path>,
        config: ReleaseConfig,
    ) -> Self {
        Self {
            runner,
            root: root.as_ref().to_path_buf(),
            output_dir: None,
            config,
            fetch_submodules: true,
            platform: None,
        }
    }

    /// Skip or run `git submodule update`.
    pub fn fetch_submodules(mut self, enabled: bool) -> Self {
        self.fetch_submodules = enabled;
        self
    }

    /// Write the archive into `dir` instead of the project root.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Use `platform` instead of detecting the host.
    pub fn with_platform(mut self, platform: PlatformDescriptor) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    /// Run without progress reporting.
    pub fn run(&self) -> Result<ReleaseReport> {
        self.run_with(&mut |_| {})
    }

    /// Run the release, calling `on_event` as it progresses.
    pub fn run_with(&self, on_event: &mut dyn FnMut(&ReleaseEvent)) -> Result<ReleaseReport> {
        let platform = match self.platform {
            Some(platform) => platform,
            None => PlatformDescriptor::detect(self.runner)?,
        };
        let version = resolve_version(
            &self.root.join(&self.config.version_file),
            &self.config.version_marker,
        )?;
        let platform_tag = build::platform_tag(&platform);

        tracing::info!("building {} {} for {}", self.config.product, version, platform);
        on_event(&ReleaseEvent::Started {
            version: version.clone(),
            platform,
            platform_tag,
        });

        let mut step = |current: Step, f: &mut dyn FnMut() -> Result<()>| -> Result<()> {
            on_event(&ReleaseEvent::StepStarted(current));
            f()?;
            on_event(&ReleaseEvent::StepFinished(current));
            Ok(())
        };

        let mut env = BuildEnvironment::new();
        let mut toolchain = None;

        if self.fetch_submodules {
            step(Step::FetchSubmodules, &mut || {
                BuildInvoker::new(self.runner, platform, &self.root, &env, &self.config)
                    .fetch_submodules()
            })?;
        }

        if platform.os == OsFamily::Windows {
            step(Step::BootstrapEnvironment, &mut || {
                env.merge(EnvironmentBootstrapper::new(self.runner, &self.config).bootstrap()?);
                Ok(())
            })?;
        } else {
            step(Step::SelectToolchain, &mut || {
                toolchain = ToolchainSelector::new(self.runner, self.config.gnu_candidates.clone())
                    .select(platform.os)?;
                Ok(())
            })?;
        }

        let invoker = BuildInvoker::new(self.runner, platform, &self.root, &env, &self.config);
        let unix = platform.os != OsFamily::Windows;

        if unix {
            step(Step::Clean, &mut || invoker.clean())?;
        }
        step(Step::Build, &mut || invoker.build(toolchain.as_ref()))?;

        let mut archive = PathBuf::new();
        step(Step::Package, &mut || {
            archive = self.package(platform, &version)?;
            Ok(())
        })?;

        if unix {
            step(Step::FinalClean, &mut || invoker.clean())?;
        }

        Ok(ReleaseReport {
            platform,
            version,
            platform_tag,
            toolchain,
            archive,
        })
    }

    fn package(&self, platform: PlatformDescriptor, version: &str) -> Result<PathBuf> {
        let output = self
            .output_dir
            .as_deref()
            .unwrap_or(&self.root)
            .join(package::archive_name(&self.config.product, version, &platform));

        let spec = match platform.os {
            OsFamily::Windows => ArchiveSpec::for_files(
                &output,
                self.root.join(&self.config.windows_output_dir),
                &self.config.windows_binaries[..],
            )?,
            OsFamily::Linux | OsFamily::Mac => {
                ArchiveSpec::for_directory(&output, self.root.join(&self.config.unix_output_dir))?
            }
        };

        Packager::new(self.runner, self.config.compressor.as_str()).package(platform.os, spec)
    }
}
