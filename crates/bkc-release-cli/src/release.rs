//! Release command implementation.
//!
//! Builds bkc for the host platform and packages the binaries.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bkc_release_core::{PlatformMode, ReleaseConfig, ReleaseEvent, ReleasePipeline, SystemRunner};

use crate::colors;

/// Options collected from the command line.
pub struct ReleaseArgs {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub skip_submodules: bool,
    pub native_platform: bool,
}

/// Run a full release build.
pub fn execute(args: ReleaseArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let root = args.root.unwrap_or_else(|| cwd.clone());
    if !root.is_dir() {
        anyhow::bail!("Project root not found: {}", root.display());
    }

    let mut config = load_config(&root, args.config.as_deref())?;
    if args.native_platform {
        config.platform_mode = PlatformMode::Native;
    }

    let start = Instant::now();
    let runner = SystemRunner;
    let pipeline = ReleasePipeline::new(&runner, &root, config)
        .output_dir(cwd)
        .fetch_submodules(!args.skip_submodules);

    let report = pipeline.run_with(&mut print_event)?;

    println!();
    println!(
        "{}Archive:{} {}",
        colors::GREEN,
        colors::RESET,
        report.archive.display()
    );
    if let Some(toolchain) = &report.toolchain {
        println!(
            "{}Compilers:{} {} / {}",
            colors::DIM,
            colors::RESET,
            toolchain.cc,
            toolchain.cxx
        );
    }
    println!(
        "{}Time:{} {:.2}s",
        colors::DIM,
        colors::RESET,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Explicit `--config` file, else `bkc-release.toml` in the root, else defaults.
fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<ReleaseConfig> {
    let config = match explicit {
        Some(path) => ReleaseConfig::load(path)?,
        None => ReleaseConfig::discover(root)?,
    };
    Ok(config)
}

fn print_event(event: &ReleaseEvent) {
    match event {
        ReleaseEvent::Started {
            version,
            platform,
            platform_tag,
        } => {
            println!("{}building{}", colors::BOLD, colors::RESET);
            println!("\tVersion: {}{}{}", colors::CYAN, version, colors::RESET);
            println!("\tOperating system: {}", platform.os);
            println!("\tHardware: {}", platform.hardware);
            println!(
                "\t{}Platform tag: {}{}",
                colors::DIM,
                platform_tag,
                colors::RESET
            );
            println!();
        }
        ReleaseEvent::StepStarted(step) => {
            println!("{}  ◆ {}{} ...", colors::BLUE, step.label(), colors::RESET);
            colors::flush_stdout();
        }
        ReleaseEvent::StepFinished(step) => {
            println!("{}  ✓ {}{}", colors::GREEN, step.label(), colors::RESET);
        }
    }
}
