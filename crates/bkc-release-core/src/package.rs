//! Release archive packaging.
//!
//! Archives are named `<product>-<version>.<os>.<hardware>.tar.gz` and hold
//! the built binaries at the archive root. Windows writes the archive
//! in-process; linux and mac stream the output directory through
//! `tar -c ... | pigz`.

use std::fs::{self, File};
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::platform::{OsFamily, PlatformDescriptor};

/// Deterministic archive file name.
pub fn archive_name(product: &str, version: &str, platform: &PlatformDescriptor) -> String {
    format!(
        "{product}-{version}.{}.{}.tar.gz",
        platform.os, platform.hardware
    )
}

/// One file stored in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Path of the build output on disk.
    pub source: PathBuf,

    /// Name inside the archive.
    pub name: String,
}

/// What to pack and where to write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSpec {
    pub output_path: PathBuf,

    /// Directory every member lives in.
    pub source_dir: PathBuf,

    pub members: Vec<ArchiveMember>,
}

impl ArchiveSpec {
    /// Archive of specific files from `source_dir`, stored under their file
    /// names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] for the first file that does not
    /// exist.
    pub fn for_files<S: AsRef<str>>(
        output_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
        files: &[S],
    ) -> Result<Self> {
        let source_dir = source_dir.into();
        let members = files
            .iter()
            .map(|name| {
                let source = source_dir.join(name.as_ref());
                if source.is_file() {
                    Ok(ArchiveMember {
                        source,
                        name: name.as_ref().to_string(),
                    })
                } else {
                    Err(Error::MissingArtifact(source))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            output_path: output_path.into(),
            source_dir,
            members,
        })
    }

    /// Archive of every entry in `source_dir`, sorted by name.
    ///
    /// Hidden entries (leading `.`) are left out, as a shell `*` glob would.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArtifact`] if the directory has no visible
    /// entries or is absent.
    pub fn for_directory(
        output_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let source_dir = source_dir.into();
        if !source_dir.is_dir() {
            return Err(Error::MissingArtifact(source_dir));
        }

        let mut members = Vec::new();
        for entry in fs::read_dir(&source_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            members.push(ArchiveMember {
                source: entry.path(),
                name,
            });
        }
        if members.is_empty() {
            return Err(Error::MissingArtifact(source_dir));
        }
        members.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            output_path: output_path.into(),
            source_dir,
            members,
        })
    }

    /// Member names in archive order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Writes [`ArchiveSpec`]s.
pub struct Packager<'a> {
    runner: &'a dyn CommandRunner,
    compressor: String,
}

impl<'a> Packager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, compressor: impl Into<String>) -> Self {
        Self {
            runner,
            compressor: compressor.into(),
        }
    }

    /// Write the archive the way `os` does and return its path.
    pub fn package(&self, os: OsFamily, spec: ArchiveSpec) -> Result<PathBuf> {
        tracing::info!(
            "packaging {} file(s) into {}",
            spec.members.len(),
            spec.output_path.display()
        );
        match os {
            OsFamily::Windows => write_archive(&spec)?,
            OsFamily::Linux | OsFamily::Mac => self.compress_external(&spec)?,
        }
        Ok(spec.output_path)
    }

    /// `cd <source_dir>; tar -c <members> | <compressor> > <output>`.
    fn compress_external(&self, spec: &ArchiveSpec) -> Result<()> {
        let tar = CommandSpec::new("tar")
            .arg("-c")
            .args(spec.names())
            .current_dir(&spec.source_dir);
        let compressor = CommandSpec::new(self.compressor.as_str());
        self.runner
            .pipe_to_file(&tar, &compressor, &spec.output_path)
    }
}

/// Write a gzip-compressed tarball in-process.
///
/// The output file is removed again if any member cannot be written.
pub fn write_archive(spec: &ArchiveSpec) -> Result<()> {
    let file = File::create(&spec.output_path)?;
    let result = append_members(file, spec);
    if result.is_err() {
        if let Err(e) = fs::remove_file(&spec.output_path) {
            tracing::warn!("could not remove {}: {}", spec.output_path.display(), e);
        }
    }
    result
}

fn append_members(file: File, spec: &ArchiveSpec) -> Result<()> {
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for member in &spec.members {
        if !member.source.exists() {
            return Err(Error::MissingArtifact(member.source.clone()));
        }
        builder.append_path_with_name(&member.source, &member.name)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}
