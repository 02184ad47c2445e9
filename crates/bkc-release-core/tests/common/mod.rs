//! Shared helpers for pipeline integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use bkc_release_core::{CapturedOutput, CommandRunner, CommandSpec, Error, Result};
use tempfile::TempDir;

/// Scripted stand-in for the host's processes.
///
/// `capture` answers from a table keyed by full command line or program name,
/// `run` records and succeeds unless the program is marked failing, and
/// `pipe_to_file` emulates `tar -c <files> | gzip > dest` in-process.
#[derive(Default)]
pub struct FakeHost {
    outputs: HashMap<String, String>,
    installed: HashSet<String>,
    failing: HashSet<String>,
    log: RefCell<Vec<CommandSpec>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, command: &str, stdout: &str) -> Self {
        let program = command.split_whitespace().next().unwrap_or(command);
        self.installed.insert(program.to_string());
        self.outputs.insert(command.to_string(), stdout.to_string());
        self
    }

    pub fn failing(mut self, program: &str) -> Self {
        self.failing.insert(program.to_string());
        self
    }

    /// GNU `gcc`/`g++` on PATH.
    pub fn with_gnu_defaults(self) -> Self {
        self.with_output("g++", "g++ (GCC) 13.2.1 20230801\n")
            .with_output("gcc", "gcc (GCC) 13.2.1 20230801\n")
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.log.borrow().clone()
    }

    pub fn ran(&self, program: &str) -> bool {
        self.log.borrow().iter().any(|c| c.program == program)
    }
}

impl CommandRunner for FakeHost {
    fn run(&self, cmd: &CommandSpec) -> Result<()> {
        self.log.borrow_mut().push(cmd.clone());
        if self.failing.contains(&cmd.program) {
            return Err(Error::CommandFailed {
                command: cmd.to_string(),
                status: "exit status: 2".to_string(),
            });
        }
        Ok(())
    }

    fn capture(&self, cmd: &CommandSpec) -> Result<CapturedOutput> {
        self.log.borrow_mut().push(cmd.clone());
        let scripted = self
            .outputs
            .get(&cmd.to_string())
            .or_else(|| self.outputs.get(&cmd.program));
        match scripted {
            Some(stdout) => Ok(CapturedOutput {
                stdout: stdout.clone(),
                success: true,
            }),
            None => Err(Error::CommandSpawn {
                command: cmd.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    fn pipe_to_file(&self, producer: &CommandSpec, consumer: &CommandSpec, dest: &Path) -> Result<()> {
        self.log.borrow_mut().push(producer.clone());
        self.log.borrow_mut().push(consumer.clone());

        let dir = producer.current_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let encoder = flate2::write::GzEncoder::new(File::create(dest)?, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for name in producer.args.iter().skip(1) {
            builder.append_path_with_name(dir.join(name), name)?;
        }
        builder.into_inner()?.finish()?;
        Ok(())
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .contains(program)
            .then(|| PathBuf::from("/opt/homebrew/bin").join(program))
    }
}

/// A bkc checkout with a version header.
pub struct Checkout {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Checkout {
    pub fn new(version: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        fs::create_dir_all(root.join("src/common")).unwrap();
        fs::write(
            root.join("src/common/defs.h"),
            format!(
                "#pragma once\n#include <string>\nusing namespace std;\n\nconst string BKC_VERSION = \"{version}\";\nconst string BKC_DATE = \"2024-03-01\";\n"
            ),
        )
        .unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn without_version() -> Self {
        let checkout = Self::new("unused");
        fs::write(checkout.root.join("src/common/defs.h"), "#pragma once\n").unwrap();
        checkout
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pretend `make` produced its binaries in `bin/`.
    pub fn with_unix_outputs(self) -> Self {
        let bin = self.root.join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("bkc"), "bkc binary").unwrap();
        fs::write(bin.join("bkc_dump"), "bkc_dump binary").unwrap();
        self
    }

    /// Pretend `devenv` produced its binaries in `x64/Release/`.
    pub fn with_windows_outputs(self) -> Self {
        let release = self.root.join("x64/Release");
        fs::create_dir_all(&release).unwrap();
        fs::write(release.join("bkc.exe"), "bkc binary").unwrap();
        fs::write(release.join("bkc_dump.exe"), "bkc_dump binary").unwrap();
        fs::write(release.join("bkc.pdb"), "symbols").unwrap();
        self
    }
}

/// `(name, contents)` of every entry in a `.tar.gz`.
pub fn archive_entries(path: &Path) -> Vec<(String, String)> {
    let decoder = flate2::read::GzDecoder::new(File::open(path).expect("archive exists"));
    let mut archive = tar::Archive::new(decoder);
    let mut entries = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().display().to_string();
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        entries.push((name, body));
    }
    entries
}
