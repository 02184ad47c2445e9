//! Release configuration.
//!
//! Defaults describe the bkc source tree. A `bkc-release.toml` next to the
//! sources may override any field:
//!
//! ```toml
//! gnu_candidates = [14, 13, 12]
//! submodule_jobs = 4
//! platform_mode = "native"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// File name looked up in the project root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "bkc-release.toml";

/// Which `PLATFORM` value the make driver receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformMode {
    /// `PLATFORM=generic`: portable binaries for release archives.
    #[default]
    Generic,
    /// The platform tag derived from the host hardware.
    Native,
}

/// Conventions of the project being released.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Product name used as the archive prefix.
    pub product: String,

    /// File holding the version marker, relative to the project root.
    pub version_file: PathBuf,

    /// Token identifying the version line.
    pub version_marker: String,

    /// GCC version suffixes probed on mac, highest first.
    pub gnu_candidates: Vec<u32>,

    /// Parallel jobs for the submodule fetch.
    pub submodule_jobs: u32,

    /// Visual Studio solution built on Windows.
    pub solution: String,

    /// `devenv` build configuration.
    pub windows_configuration: String,

    /// Directory holding the Windows build outputs.
    pub windows_output_dir: PathBuf,

    /// Executables packaged on Windows.
    pub windows_binaries: Vec<String>,

    /// Directory whose whole contents are packaged on linux and mac.
    pub unix_output_dir: PathBuf,

    /// Location of `vswhere.exe`, with `%VAR%` references.
    pub vswhere_path: String,

    /// Environment script, relative to the Visual Studio installation.
    pub vcvars_script: PathBuf,

    /// Gzip-compatible compressor reading stdin.
    pub compressor: String,

    pub platform_mode: PlatformMode,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            product: "bkc".to_string(),
            version_file: PathBuf::from("src/common/defs.h"),
            version_marker: "BKC_VERSION".to_string(),
            gnu_candidates: vec![13, 12, 11, 10],
            submodule_jobs: 8,
            solution: "bkc.sln".to_string(),
            windows_configuration: "Release|x64".to_string(),
            windows_output_dir: PathBuf::from("x64/Release"),
            windows_binaries: vec!["bkc.exe".to_string(), "bkc_dump.exe".to_string()],
            unix_output_dir: PathBuf::from("bin"),
            vswhere_path: "%ProgramFiles(x86)%/Microsoft Visual Studio/Installer/vswhere.exe"
                .to_string(),
            vcvars_script: PathBuf::from("VC/Auxiliary/Build/vcvars64.bat"),
            compressor: "pigz".to_string(),
            platform_mode: PlatformMode::Generic,
        }
    }
}

impl ReleaseConfig {
    /// Parse a TOML configuration.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from an explicit file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&source).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Load `bkc-release.toml` from the project root, or use defaults when
    /// the file does not exist.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::info!("using configuration {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
