//! Compiler selection and GNU family validation.
//!
//! bkc must be built with GNU g++/gcc. Linux uses the default `gcc`/`g++`
//! pair. On mac those names point at Apple clang, so the versioned Homebrew
//! names (`g++-13`, `gcc-13`, ...) are probed instead. Windows builds go
//! through the Visual Studio driver and are not validated here.

use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::platform::OsFamily;

/// Default C compiler.
pub const DEFAULT_CC: &str = "gcc";

/// Default C++ compiler.
pub const DEFAULT_CXX: &str = "g++";

/// Substring a GNU C compiler prints in its `--version` output.
const GNU_CC_SIGNATURE: &str = "gcc";

/// Substring a GNU C++ compiler prints in its `--version` output.
const GNU_CXX_SIGNATURE: &str = "g++";

/// The C and C++ compilers handed to the build driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSelection {
    pub cc: String,
    pub cxx: String,
}

impl ToolchainSelection {
    pub fn new(cc: impl Into<String>, cxx: impl Into<String>) -> Self {
        Self {
            cc: cc.into(),
            cxx: cxx.into(),
        }
    }

    /// Versioned pair, e.g. `gcc-12`/`g++-12`.
    pub fn versioned(suffix: u32) -> Self {
        Self::new(
            format!("{DEFAULT_CC}-{suffix}"),
            format!("{DEFAULT_CXX}-{suffix}"),
        )
    }
}

impl Default for ToolchainSelection {
    fn default() -> Self {
        Self::new(DEFAULT_CC, DEFAULT_CXX)
    }
}

/// Chooses and validates the compiler pair for a platform.
pub struct ToolchainSelector<'a> {
    runner: &'a dyn CommandRunner,

    /// Version suffixes probed on mac, in order.
    candidates: Vec<u32>,
}

impl<'a> ToolchainSelector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, candidates: Vec<u32>) -> Self {
        Self { runner, candidates }
    }

    /// Select the compilers for `os`.
    ///
    /// Returns `None` on Windows, where the vendor driver picks its own
    /// toolchain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolchainMismatch`] if the chosen compilers do not
    /// identify as GNU.
    pub fn select(&self, os: OsFamily) -> Result<Option<ToolchainSelection>> {
        let selection = match os {
            OsFamily::Windows => return Ok(None),
            OsFamily::Linux => ToolchainSelection::default(),
            OsFamily::Mac => self.probe_versioned().unwrap_or_else(|| {
                tracing::warn!("no versioned GNU toolchain found, falling back to defaults");
                ToolchainSelection::default()
            }),
        };

        self.validate(&selection)?;
        tracing::info!("using CC={} CXX={}", selection.cc, selection.cxx);
        Ok(Some(selection))
    }

    /// First candidate suffix whose C and C++ compilers both exist and both
    /// identify as GNU.
    pub fn probe_versioned(&self) -> Option<ToolchainSelection> {
        self.candidates
            .iter()
            .find_map(|&suffix| self.try_candidate(suffix))
    }

    fn try_candidate(&self, suffix: u32) -> Option<ToolchainSelection> {
        let candidate = ToolchainSelection::versioned(suffix);

        let installed = self.runner.locate(&candidate.cxx).is_some()
            && self.runner.locate(&candidate.cc).is_some();
        if !installed {
            tracing::debug!("skipping {}/{}: not installed", candidate.cc, candidate.cxx);
            return None;
        }

        if !self.reports_family(&candidate.cxx, GNU_CC_SIGNATURE)
            || !self.reports_family(&candidate.cc, GNU_CC_SIGNATURE)
        {
            tracing::warn!(
                "skipping {}/{}: not GNU compilers",
                candidate.cc,
                candidate.cxx
            );
            return None;
        }

        tracing::debug!("found GNU toolchain suffix {}", suffix);
        Some(candidate)
    }

    /// Check that both compilers self-report the GNU family.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolchainMismatch`] if either does not.
    pub fn validate(&self, selection: &ToolchainSelection) -> Result<()> {
        let cxx_ok = self.reports_family(&selection.cxx, GNU_CXX_SIGNATURE);
        let cc_ok = self.reports_family(&selection.cc, GNU_CC_SIGNATURE);

        if cxx_ok && cc_ok {
            Ok(())
        } else {
            Err(Error::ToolchainMismatch {
                cc: selection.cc.clone(),
                cxx: selection.cxx.clone(),
            })
        }
    }

    /// Run `<compiler> --version` and look for `signature`, ignoring case.
    ///
    /// A compiler that cannot be started does not report the family.
    fn reports_family(&self, compiler: &str, signature: &str) -> bool {
        match self
            .runner
            .capture(&CommandSpec::new(compiler).arg("--version"))
        {
            Ok(output) => output.stdout.to_lowercase().contains(signature),
            Err(e) => {
                tracing::debug!("{} --version failed: {}", compiler, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::ScriptedRunner;

    const HOMEBREW_GXX: &str = "g++-12 (Homebrew GCC 12.3.0) 12.3.0\n";
    const HOMEBREW_GCC: &str = "gcc-12 (Homebrew GCC 12.3.0) 12.3.0\n";
    const APPLE_CLANG: &str = "Apple clang version 15.0.0 (clang-1500.1.0.2.5)\n";

    #[test]
    fn test_mac_picks_first_complete_candidate() {
        let runner = ScriptedRunner::default()
            .with_output("g++-12", HOMEBREW_GXX)
            .with_output("gcc-12", HOMEBREW_GCC)
            .with_output("g++-11", "g++-11 (Homebrew GCC 11.4.0) 11.4.0\n")
            .with_output("gcc-11", "gcc-11 (Homebrew GCC 11.4.0) 11.4.0\n");
        let selector = ToolchainSelector::new(&runner, vec![13, 12, 11, 10]);

        let selection = selector.select(OsFamily::Mac).unwrap();
        assert_eq!(selection, Some(ToolchainSelection::versioned(12)));
    }

    #[test]
    fn test_mac_skips_partial_candidates() {
        // 13 only has the C++ compiler installed, 12 has a clang impostor.
        let runner = ScriptedRunner::default()
            .with_output("g++-13", "g++-13 (Homebrew GCC 13.2.0) 13.2.0\n")
            .with_output("g++-12", HOMEBREW_GXX)
            .with_output("gcc-12", APPLE_CLANG)
            .with_output("g++-11", "g++-11 (Homebrew GCC 11.4.0) 11.4.0\n")
            .with_output("gcc-11", "gcc-11 (Homebrew GCC 11.4.0) 11.4.0\n");
        let selector = ToolchainSelector::new(&runner, vec![13, 12, 11, 10]);

        assert_eq!(
            selector.probe_versioned(),
            Some(ToolchainSelection::versioned(11))
        );
    }

    #[test]
    fn test_mac_without_candidates_fails_validation() {
        let runner = ScriptedRunner::default()
            .with_output("g++", APPLE_CLANG)
            .with_output("gcc", APPLE_CLANG);
        let selector = ToolchainSelector::new(&runner, vec![13, 12, 11, 10]);

        let err = selector.select(OsFamily::Mac).unwrap_err();
        assert!(matches!(
            err,
            Error::ToolchainMismatch { ref cc, ref cxx } if cc == "gcc" && cxx == "g++"
        ));
    }

    #[test]
    fn test_linux_uses_defaults() {
        let runner = ScriptedRunner::default()
            .with_output("g++", "g++ (Ubuntu 11.4.0-1ubuntu1~22.04) 11.4.0\n")
            .with_output("gcc", "gcc (Ubuntu 11.4.0-1ubuntu1~22.04) 11.4.0\n");
        let selector = ToolchainSelector::new(&runner, vec![13]);

        let selection = selector.select(OsFamily::Linux).unwrap();
        assert_eq!(selection, Some(ToolchainSelection::default()));
        assert!(!runner.commands().iter().any(|c| c.starts_with("g++-13")));
    }

    #[test]
    fn test_validation_rejects_non_gnu_c_compiler() {
        let runner = ScriptedRunner::default()
            .with_output("g++", "g++ (GCC) 13.2.1\n")
            .with_output("gcc", "clang version 17.0.6\n");
        let selector = ToolchainSelector::new(&runner, Vec::new());

        assert!(matches!(
            selector.select(OsFamily::Linux),
            Err(Error::ToolchainMismatch { .. })
        ));
    }

    #[test]
    fn test_validation_is_case_insensitive() {
        let runner = ScriptedRunner::default()
            .with_output("g++", "G++ (GCC) 13.2.1\n")
            .with_output("gcc", "GCC (GCC) 13.2.1\n");
        let selector = ToolchainSelector::new(&runner, Vec::new());

        assert!(selector.validate(&ToolchainSelection::default()).is_ok());
    }

    #[test]
    fn test_missing_compiler_fails_validation() {
        let runner = ScriptedRunner::default().with_output("g++", "g++ (GCC) 13.2.1\n");
        let selector = ToolchainSelector::new(&runner, Vec::new());

        assert!(selector.validate(&ToolchainSelection::default()).is_err());
    }

    #[test]
    fn test_windows_skips_selection() {
        let runner = ScriptedRunner::default();
        let selector = ToolchainSelector::new(&runner, vec![13]);

        assert_eq!(selector.select(OsFamily::Windows).unwrap(), None);
        assert!(runner.commands().is_empty());
    }
}
