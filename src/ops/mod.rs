//! High-level operations.
//!
//! This module contains the implementation of Bulwark commands. Each
//! operation loads the merged configuration, detects the toolchain,
//! runs the engine, and persists the probe cache for the next run.

pub mod harden;
pub mod ipo;
pub mod probe;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::{BuildScope, PropertyTarget};
use crate::engine::{CompilerProbe, Engine, Modes, ProbeCache};
use crate::toolchain::detect_toolchain;
use crate::util::config::load_config;
use crate::util::{Config, GlobalContext};

pub use harden::{harden, HardenOptions};
pub use ipo::{ipo, IpoOptions};
pub use probe::{probe_flag, ProbeOptions};

/// Configuration and engine state shared by the operations.
pub struct Session {
    /// Merged configuration (global, project, then CLI overrides)
    pub config: Config,

    /// The running engine
    pub engine: Engine,
}

/// Load the merged configuration for the current project.
pub fn load_session_config(gctx: &GlobalContext) -> Config {
    load_config(&gctx.config_path(), &gctx.project_config_path())
}

/// Detect the toolchain and start an engine over the persistent probe
/// cache (or a bypass cache when fresh probes were requested).
pub fn start_session(gctx: &GlobalContext, config: Config) -> Result<Session> {
    let toolchain = detect_toolchain(&config)?;

    let cache = if config.probe.no_cache {
        ProbeCache::bypass()
    } else {
        ProbeCache::load(&gctx.probe_cache_path(), &toolchain.fingerprint())
    };

    let probe = CompilerProbe::new(&toolchain).with_timeout(config.probe.timeout());
    let modes = Modes {
        full_hardening: config.hardening.full,
        thin_lto: config.lto.thin,
    };

    let engine = Engine::with_probe(toolchain, modes, cache, Box::new(probe));
    Ok(Session { config, engine })
}

impl Session {
    /// Persist probe results for the next run.
    pub fn persist_cache(&self, gctx: &GlobalContext) -> Result<()> {
        if self.config.probe.no_cache {
            return Ok(());
        }
        self.engine.cache().save(
            &gctx.probe_cache_path(),
            &self.engine.toolchain().fingerprint(),
        )
    }
}

#[derive(Debug, Serialize)]
struct EmitTargets<'a> {
    #[serde(rename = "target")]
    targets: &'a [PropertyTarget],
}

#[derive(Debug, Serialize)]
struct EmitScope<'a> {
    scope: &'a BuildScope,
}

/// Write configured targets as TOML for the outer build system.
pub(crate) fn emit_targets(path: &Path, targets: &[PropertyTarget]) -> Result<()> {
    write_toml(path, &EmitTargets { targets })
}

/// Write scope-wide properties as TOML for the outer build system.
pub(crate) fn emit_scope(path: &Path, scope: &BuildScope) -> Result<()> {
    write_toml(path, &EmitScope { scope })
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let contents =
        toml::to_string_pretty(value).context("failed to serialize emitted configuration")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
