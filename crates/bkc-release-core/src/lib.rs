//! Core engine for the bkc release builder.
//!
//! This crate provides:
//! - Host platform detection
//! - Version lookup from the C++ sources
//! - GNU toolchain probing and validation
//! - Visual Studio developer environment capture
//! - Build driver invocation and release archive packaging
//!
//! # Flow
//!
//! ```text
//! PlatformDescriptor::detect ─┐
//! resolve_version ────────────┼─► ToolchainSelector (linux/mac)
//!                             │   EnvironmentBootstrapper (windows)
//!                             │          │
//!                             │          ▼
//!                             │    BuildInvoker ──► Packager ──► bkc-<ver>.<os>.<hw>.tar.gz
//! ```

pub mod build;
pub mod config;
pub mod environment;
pub mod error;
pub mod exec;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod toolchain;
pub mod version;

pub use build::{BuildInvoker, platform_tag};
pub use config::{PlatformMode, ReleaseConfig};
pub use environment::{BuildEnvironment, EnvironmentBootstrapper};
pub use error::{Error, Result};
pub use exec::{CapturedOutput, CommandRunner, CommandSpec, SystemRunner};
pub use package::{ArchiveMember, ArchiveSpec, Packager, archive_name};
pub use pipeline::{ReleaseEvent, ReleasePipeline, ReleaseReport, Step};
pub use platform::{Hardware, OsFamily, PlatformDescriptor};
pub use toolchain::{ToolchainSelection, ToolchainSelector};
pub use version::resolve_version;
