//! Visual Studio developer environment bootstrapping.
//!
//! `devenv` only finds the MSVC compilers and libraries when started from a
//! developer shell. The bootstrapper asks `vswhere.exe` for the latest
//! installation, runs its `vcvars64.bat` followed by `set`, and captures the
//! printed variables into a [`BuildEnvironment`] that is attached to every
//! command spawned afterwards. The orchestrator's own environment is never
//! modified.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ReleaseConfig;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};

/// Variables layered over the inherited environment of build commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    vars: BTreeMap<String, String>,
}

impl BuildEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `NAME=value` table as printed by `set`.
    ///
    /// Each line is split on its first `=`. Lines without one, or with an
    /// empty name, are skipped.
    pub fn parse(table: &str) -> Self {
        let mut env = Self::new();
        for line in table.lines() {
            match line.split_once('=') {
                Some((key, value)) if !key.is_empty() => env.insert(key, value),
                _ => tracing::trace!("skipping environment line: {}", line),
            }
        }
        env
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Add every variable of `other`, replacing existing values.
    pub fn merge(&mut self, other: BuildEnvironment) {
        self.vars.extend(other.vars);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Attach these variables to a command.
    pub fn apply(&self, cmd: CommandSpec) -> CommandSpec {
        cmd.envs(self.iter())
    }
}

/// Expand `%NAME%` references the way `cmd.exe` does.
///
/// Unknown names are left untouched, including their percent signs.
pub fn expand_windows_vars(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match (!name.is_empty()).then(|| lookup(name)).flatten() {
                    Some(value) => {
                        out.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // Keep the opening `%`; the closing one may start
                        // the next reference.
                        out.push('%');
                        rest = after;
                    }
                }
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Captures the Visual Studio developer environment.
pub struct EnvironmentBootstrapper<'a> {
    runner: &'a dyn CommandRunner,
    vswhere_path: String,
    vcvars_script: PathBuf,
}

impl<'a> EnvironmentBootstrapper<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &ReleaseConfig) -> Self {
        Self {
            runner,
            vswhere_path: config.vswhere_path.clone(),
            vcvars_script: config.vcvars_script.clone(),
        }
    }

    /// Run the bootstrap against the orchestrator's own environment.
    pub fn bootstrap(&self) -> Result<BuildEnvironment> {
        self.bootstrap_with(|name| std::env::var(name).ok())
    }

    /// Run the bootstrap, expanding the installer path with `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvironmentSetup`] if `vswhere.exe` is absent, reports
    /// no installation, or the environment script prints no variables.
    pub fn bootstrap_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<BuildEnvironment> {
        let vswhere = PathBuf::from(expand_windows_vars(&self.vswhere_path, lookup));
        if !vswhere.exists() {
            return Err(Error::EnvironmentSetup(format!(
                "vswhere.exe not found at: {}",
                vswhere.display()
            )));
        }

        let install_dir = self.installation_path(&vswhere)?;
        let vcvars = install_dir.join(&self.vcvars_script);
        tracing::info!("initialising developer environment from {}", vcvars.display());

        let shell = CommandSpec::new("cmd").args([
            "/C".to_string(),
            "call".to_string(),
            vcvars.display().to_string(),
            "&&".to_string(),
            "set".to_string(),
        ]);
        let output = self.runner.capture(&shell)?;

        let env = BuildEnvironment::parse(&output.stdout);
        if env.is_empty() {
            return Err(Error::EnvironmentSetup(format!(
                "{} did not print an environment",
                vcvars.display()
            )));
        }

        tracing::debug!("captured {} environment variables", env.len());
        Ok(env)
    }

    fn installation_path(&self, vswhere: &Path) -> Result<PathBuf> {
        let query = CommandSpec::new(vswhere.display().to_string()).args([
            "-latest",
            "-property",
            "installationPath",
        ]);
        let output = self.runner.capture(&query)?;

        let install_dir = output.stdout.trim_end();
        if install_dir.is_empty() {
            return Err(Error::EnvironmentSetup(
                "vswhere.exe found no Visual Studio installation".to_string(),
            ));
        }
        Ok(PathBuf::from(install_dir))
    }
}
