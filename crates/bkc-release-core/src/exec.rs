//! External process execution.
//!
//! Every shell-out (compiler probes, vendor tools, build drivers, archivers)
//! goes through [`CommandRunner`] so the platform logic can be driven by a
//! scripted runner in tests. Commands are run one at a time and waited on to
//! completion; there are no timeouts.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Description of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments, passed verbatim.
    pub args: Vec<String>,

    /// Working directory (inherits the orchestrator's when `None`).
    pub current_dir: Option<PathBuf>,

    /// Variables added on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output collected from a captured command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub success: bool,
}

/// Executes external processes on behalf of the pipeline.
pub trait CommandRunner {
    /// Run with inherited stdio and wait. A non-zero exit is an error.
    fn run(&self, cmd: &CommandSpec) -> Result<()>;

    /// Run and collect stdout. The exit status is reported, not checked.
    fn capture(&self, cmd: &CommandSpec) -> Result<CapturedOutput>;

    /// Run `producer | consumer > dest`, checking both exit statuses.
    ///
    /// `dest` does not exist afterwards unless the whole pipe succeeded.
    fn pipe_to_file(
        &self,
        producer: &CommandSpec,
        consumer: &CommandSpec,
        dest: &Path,
    ) -> Result<()>;

    /// Resolve `program` on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// [`CommandRunner`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn_error(cmd: &CommandSpec, source: std::io::Error) -> Error {
        Error::CommandSpawn {
            command: cmd.to_string(),
            source,
        }
    }

    fn check(cmd: &CommandSpec, status: std::process::ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: cmd.to_string(),
                status: status.to_string(),
            })
        }
    }

    /// `producer | consumer > sink`, checking both exit statuses.
    fn pipe_into(producer: &CommandSpec, consumer: &CommandSpec, sink: File) -> Result<()> {
        let mut upstream = producer
            .to_command()
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(producer, e))?;

        let Some(pipe) = upstream.stdout.take() else {
            let _ = upstream.kill();
            return Err(Error::CommandSpawn {
                command: producer.to_string(),
                source: std::io::Error::other("stdout was not captured"),
            });
        };

        let downstream = consumer
            .to_command()
            .stdin(pipe)
            .stdout(sink)
            .spawn();

        let mut downstream = match downstream {
            Ok(child) => child,
            Err(e) => {
                let _ = upstream.kill();
                let _ = upstream.wait();
                return Err(Self::spawn_error(consumer, e));
            }
        };

        let consumer_status = downstream.wait()?;
        let producer_status = upstream.wait()?;

        Self::check(producer, producer_status)?;
        Self::check(consumer, consumer_status)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<()> {
        tracing::debug!("running: {}", cmd);
        let status = cmd
            .to_command()
            .status()
            .map_err(|e| Self::spawn_error(cmd, e))?;
        Self::check(cmd, status)
    }

    fn capture(&self, cmd: &CommandSpec) -> Result<CapturedOutput> {
        tracing::debug!("capturing: {}", cmd);
        let output = cmd
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(cmd, e))?;

        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            success: output.status.success(),
        })
    }

    fn pipe_to_file(
        &self,
        producer: &CommandSpec,
        consumer: &CommandSpec,
        dest: &Path,
    ) -> Result<()> {
        tracing::debug!("piping: {} | {} > {}", producer, consumer, dest.display());
        let sink = File::create(dest)?;

        let result = Self::pipe_into(producer, consumer, sink);
        if result.is_err() {
            // A failed pipe must not leave a truncated file behind.
            if let Err(e) = fs::remove_file(dest) {
                tracing::warn!("could not remove {}: {}", dest.display(), e);
            }
        }
        result
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted runner for unit tests.

    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[derive(Default)]
    pub struct ScriptedRunner {
        /// Full command line, or bare program name, -> stdout returned by `capture`.
        pub outputs: HashMap<String, String>,
        /// Programs `locate` can find.
        pub installed: HashSet<String>,
        /// Programs whose `run` exits non-zero.
        pub failing: HashSet<String>,
        /// Every command passed to `run`, `capture` or `pipe_to_file`.
        pub log: RefCell<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
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

        pub fn commands(&self) -> Vec<String> {
            self.log.borrow().iter().map(ToString::to_string).collect()
        }
    }

    impl CommandRunner for ScriptedRunner {
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

        fn pipe_to_file(
            &self,
            producer: &CommandSpec,
            consumer: &CommandSpec,
            dest: &Path,
        ) -> Result<()> {
            self.log.borrow_mut().push(producer.clone());
            self.log.borrow_mut().push(consumer.clone());
            std::fs::write(dest, b"")?;
            Ok(())
        }

        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.installed
                .contains(program)
                .then(|| PathBuf::from("/usr/local/bin").join(program))
        }
    }
}
