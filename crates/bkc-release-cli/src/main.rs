//! bkc-release - builds and packages versioned bkc release archives.

mod colors;
mod release;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "bkc-release")]
#[command(about = "Build bkc for this host and package a versioned release archive")]
#[command(version)]
struct Cli {
    /// Project root (defaults to the current directory). The archive is
    /// always written to the current directory.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Configuration file (defaults to bkc-release.toml in the project root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not run `git submodule update` before building
    #[arg(long)]
    skip_submodules: bool,

    /// Pass the host platform tag to make instead of PLATFORM=generic
    #[arg(long)]
    native_platform: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Attach recovery hints to core errors
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<bkc_release_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    release::execute(release::ReleaseArgs {
        root: cli.root,
        config: cli.config,
        skip_submodules: cli.skip_submodules,
        native_platform: cli.native_platform,
    })
    .map_err(format_error)?;

    Ok(())
}
