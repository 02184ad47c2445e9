//! Error types for bkc-release-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for bkc-release-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a release run.
///
/// Every variant is terminal: the pipeline performs no retries and has no
/// partial-success mode.
#[derive(Debug, Error)]
pub enum Error {
    /// Host OS or hardware outside the known set.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The version marker line is absent or carries no literal.
    #[error("cannot read {marker} version from {}: {reason}", path.display())]
    MissingVersion {
        path: PathBuf,
        marker: String,
        reason: String,
    },

    /// The selected compilers do not identify as GNU g++/gcc.
    #[error("the selected C++ compiler ({cxx}) or C compiler ({cc}) is not GNU g++/gcc")]
    ToolchainMismatch { cc: String, cxx: String },

    /// Vendor developer environment could not be initialised.
    #[error("environment setup failed: {0}")]
    EnvironmentSetup(String),

    /// A build output expected by the packager does not exist.
    #[error("missing build output: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// An external process ran but exited unsuccessfully.
    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: String },

    /// An external process could not be started.
    #[error("failed to run `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Recovery hint shown to the user alongside the message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::UnsupportedPlatform(_) => {
                Some("release builds are only defined for windows, linux and mac on x64 or arm64")
            }
            Error::MissingVersion { .. } => {
                Some("run from the project root or pass --root; the version file must define the marker as a quoted string")
            }
            Error::ToolchainMismatch { .. } => {
                Some("if you are using macOS, you may install GNU g++ with Homebrew (https://brew.sh/)")
            }
            Error::EnvironmentSetup(_) => {
                Some("install Visual Studio with the C++ workload; vswhere.exe ships with the Visual Studio Installer")
            }
            Error::MissingArtifact(_) => Some("the build step did not produce the expected binaries"),
            Error::Config(_) => Some("check bkc-release.toml or the file passed with --config"),
            Error::CommandFailed { .. } | Error::CommandSpawn { .. } | Error::Io(_) => None,
        }
    }

    /// Render the error together with its recovery hint.
    pub fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}
