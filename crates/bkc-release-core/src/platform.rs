//! Host platform detection.
//!
//! Classifies the host into an OS family and hardware architecture. Anything
//! outside the known set is fatal: no fallback build configuration is known
//! to be safe.

use std::fmt;

use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};

/// Operating-system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Linux,
    Mac,
}

impl OsFamily {
    /// Classify a `uname -s` kernel name.
    pub fn from_sysname(sysname: &str) -> Result<Self> {
        match sysname.trim() {
            "Linux" => Ok(OsFamily::Linux),
            "Darwin" => Ok(OsFamily::Mac),
            other => Err(Error::UnsupportedPlatform(format!("unknown os {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::Mac => "mac",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware architecture of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hardware {
    X64,
    Arm64,
}

impl Hardware {
    /// Classify a `uname -m` machine name.
    pub fn from_machine(machine: &str) -> Result<Self> {
        match machine.trim() {
            "x86_64" => Ok(Hardware::X64),
            "aarch64" | "arm64" => Ok(Hardware::Arm64),
            other => Err(Error::UnsupportedPlatform(format!("unknown hardware {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hardware::X64 => "x64",
            Hardware::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Hardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OS family and hardware of the host, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformDescriptor {
    pub os: OsFamily,
    pub hardware: Hardware,
}

impl PlatformDescriptor {
    pub fn new(os: OsFamily, hardware: Hardware) -> Self {
        Self { os, hardware }
    }

    /// Detect the host platform.
    ///
    /// On POSIX hosts the kernel and machine names come from `uname -s` and
    /// `uname -m`.
    pub fn detect(runner: &dyn CommandRunner) -> Result<Self> {
        let family = std::env::consts::FAMILY;
        if family != "unix" {
            return Self::classify(family, "", "");
        }

        let sysname = Self::uname(runner, "-s")?;
        let machine = Self::uname(runner, "-m")?;
        Self::classify(family, &sysname, &machine)
    }

    /// Classify a host from its OS family (`windows`/`unix`) and, for unix,
    /// its `uname -s` and `uname -m` values.
    pub fn classify(family: &str, sysname: &str, machine: &str) -> Result<Self> {
        match family {
            // TODO: detect ARM64 Windows hosts instead of assuming x64.
            "windows" => Ok(Self::new(OsFamily::Windows, Hardware::X64)),
            "unix" => {
                let os = OsFamily::from_sysname(sysname)?;
                let hardware = Hardware::from_machine(machine)?;
                Ok(Self::new(os, hardware))
            }
            other => Err(Error::UnsupportedPlatform(format!(
                "unknown os family {other}"
            ))),
        }
    }

    fn uname(runner: &dyn CommandRunner, flag: &str) -> Result<String> {
        let output = runner.capture(&CommandSpec::new("uname").arg(flag))?;
        if !output.success {
            return Err(Error::UnsupportedPlatform(format!(
                "`uname {flag}` did not report a value"
            )));
        }
        Ok(output.stdout.trim().to_string())
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.os, self.hardware)
    }
}
