//! Build driver invocation.
//!
//! Windows builds the Visual Studio solution with `devenv`. Linux and mac run
//! the project Makefile (`gmake` on mac, where `make` is BSD make) with the
//! selected GNU compilers and static linking.

use std::path::{Path, PathBuf};

use crate::config::{PlatformMode, ReleaseConfig};
use crate::environment::BuildEnvironment;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::platform::{Hardware, OsFamily, PlatformDescriptor};
use crate::toolchain::ToolchainSelection;

/// `PLATFORM` value for portable builds.
pub const GENERIC_PLATFORM: &str = "generic";

/// Target tag for the host hardware.
pub fn platform_tag(platform: &PlatformDescriptor) -> &'static str {
    match (platform.os, platform.hardware) {
        (OsFamily::Mac, Hardware::Arm64) => "m1",
        (_, Hardware::Arm64) => "arm8",
        (_, Hardware::X64) => "avx",
    }
}

/// Make program for a unix family.
pub fn make_program(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Mac => "gmake",
        OsFamily::Linux | OsFamily::Windows => "make",
    }
}

/// Runs the external build system for one platform.
pub struct BuildInvoker<'a> {
    runner: &'a dyn CommandRunner,
    platform: PlatformDescriptor,
    root: PathBuf,
    env: &'a BuildEnvironment,
    config: &'a ReleaseConfig,
}

impl<'a> BuildInvoker<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        platform: PlatformDescriptor,
        root: impl AsRef<Path>,
        env: &'a BuildEnvironment,
        config: &'a ReleaseConfig,
    ) -> Self {
        Self {
            runner,
            platform,
            root: root.as_ref().to_path_buf(),
            env,
            config,
        }
    }

    /// Fetch git submodules.
    pub fn fetch_submodules(&self) -> Result<()> {
        let cmd = self.command("git").args([
            "submodule".to_string(),
            "update".to_string(),
            "--init".to_string(),
            "--recursive".to_string(),
            format!("--jobs={}", self.config.submodule_jobs),
        ]);
        self.runner.run(&cmd)
    }

    /// Remove previous build outputs. No-op on Windows.
    pub fn clean(&self) -> Result<()> {
        if self.platform.os == OsFamily::Windows {
            return Ok(());
        }
        let cmd = self.command(make_program(self.platform.os)).arg("clean");
        self.runner.run(&cmd)
    }

    /// Run the build to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] when the driver exits non-zero, and
    /// [`Error::ToolchainMismatch`] if a make build is requested without a
    /// compiler selection.
    pub fn build(&self, toolchain: Option<&ToolchainSelection>) -> Result<()> {
        let cmd = self.build_command(toolchain)?;
        tracing::info!("building: {}", cmd);
        self.runner.run(&cmd)
    }

    /// The build command for this platform.
    pub fn build_command(&self, toolchain: Option<&ToolchainSelection>) -> Result<CommandSpec> {
        if self.platform.os == OsFamily::Windows {
            return Ok(self.command("devenv").args([
                self.config.solution.as_str(),
                "/Build",
                self.config.windows_configuration.as_str(),
            ]));
        }

        let toolchain = toolchain.ok_or_else(|| Error::ToolchainMismatch {
            cc: "<none>".to_string(),
            cxx: "<none>".to_string(),
        })?;

        let platform = match self.config.platform_mode {
            PlatformMode::Generic => GENERIC_PLATFORM,
            PlatformMode::Native => platform_tag(&self.platform),
        };

        Ok(self.command(make_program(self.platform.os)).args([
            format!("CXX={}", toolchain.cxx),
            format!("CC={}", toolchain.cc),
            format!("PLATFORM={platform}"),
            "STATIC_LINK=true".to_string(),
            jobs_flag(),
        ]))
    }

    fn command(&self, program: &str) -> CommandSpec {
        self.env
            .apply(CommandSpec::new(program))
            .current_dir(&self.root)
    }
}

/// `-j<n>` for the available parallelism, or bare `-j` when unknown.
fn jobs_flag() -> String {
    match std::thread::available_parallelism() {
        Ok(n) => format!("-j{n}"),
        Err(_) => "-j".to_string(),
    }
}
