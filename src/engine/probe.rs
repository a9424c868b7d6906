//! Capability probing - does the toolchain accept a flag?
//!
//! A probe is a trial compilation (or trial link) of a minimal C source
//! in a temporary sandbox. Every failure mode - unknown flag, compiler
//! crash, spawn error, timeout - means "rejected"; capability absence is
//! routine, never an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::toolchain::ToolchainDescriptor;
use crate::util::process::ProcessBuilder;

/// Which property category a flag belongs to, which also selects the
/// trial used to probe it: compile options get a compile-only trial,
/// link options get a full link trial through the compiler driver.
/// Preprocessor definitions are never probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagCategory {
    /// Compiler invocation flag
    CompileOption,
    /// Linker invocation flag (passed through the driver)
    LinkOption,
    /// Preprocessor definition (`NAME` or `NAME=VALUE`)
    CompileDefinition,
}

impl FlagCategory {
    /// Get the category name as a string (used in cache keys).
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagCategory::CompileOption => "compile",
            FlagCategory::LinkOption => "link",
            FlagCategory::CompileDefinition => "define",
        }
    }
}

impl std::fmt::Display for FlagCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A capability probe: yes/no acceptance of a candidate flag.
///
/// The production implementation shells out to the compiler; tests
/// inject table-driven fakes.
pub trait CapabilityProbe {
    /// Whether the toolchain accepts `flag` in the given category.
    fn probe(&self, flag: &str, category: FlagCategory) -> bool;
}

/// Minimal translation unit used for trial compiles and links.
const PROBE_SOURCE: &str = "int main(void) { return 0; }\n";

/// Default per-probe timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Probe implementation that runs real trial compilations.
#[derive(Debug, Clone)]
pub struct CompilerProbe {
    cc: std::path::PathBuf,
    timeout: Duration,
}

impl CompilerProbe {
    /// Create a probe for the given toolchain's driver.
    pub fn new(toolchain: &ToolchainDescriptor) -> Self {
        CompilerProbe {
            cc: toolchain.compiler_path().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn try_probe(&self, flag: &str, category: FlagCategory) -> anyhow::Result<bool> {
        let sandbox = tempfile::tempdir()?;
        let source = sandbox.path().join("probe.c");
        std::fs::write(&source, PROBE_SOURCE)?;

        // -Werror turns "unknown option" warnings into hard failures so
        // drivers that merely warn about unrecognized flags still reject.
        let mut pb = ProcessBuilder::new(&self.cc)
            .cwd(sandbox.path())
            .arg("-Werror")
            .arg(flag);

        pb = match category {
            FlagCategory::CompileOption => pb.args(["-c", "probe.c", "-o", "probe.o"]),
            FlagCategory::LinkOption => pb.args(["probe.c", "-o", "probe.bin"]),
            FlagCategory::CompileDefinition => {
                // Definitions are attached unconditionally by the entry
                // points; a direct probe request still gets a sensible trial.
                return Ok(true);
            }
        };

        match pb.exec_with_timeout(self.timeout)? {
            Some(status) => Ok(status.success()),
            None => {
                tracing::warn!(
                    "probe of `{}` timed out after {:?}; treating as rejected",
                    flag,
                    self.timeout
                );
                Ok(false)
            }
        }
    }
}

impl CapabilityProbe for CompilerProbe {
    fn probe(&self, flag: &str, category: FlagCategory) -> bool {
        match self.try_probe(flag, category) {
            Ok(accepted) => {
                tracing::debug!(
                    "probe {} `{}`: {}",
                    category,
                    flag,
                    if accepted { "accepted" } else { "rejected" }
                );
                accepted
            }
            Err(e) => {
                // Probe execution failure is indistinguishable from an
                // unsupported capability as far as composition goes.
                tracing::debug!("probe of `{}` failed to run: {:#}", flag, e);
                false
            }
        }
    }
}
