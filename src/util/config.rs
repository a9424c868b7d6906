//! Configuration file support for Bulwark.
//!
//! Bulwark supports two configuration file locations:
//! - Global: `~/.bulwark/config.toml` - User-wide defaults
//! - Project: `.bulwark/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Bulwark configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hardening settings
    pub hardening: HardeningConfig,

    /// Link-time optimization settings
    pub lto: LtoConfig,

    /// Capability probe settings
    pub probe: ProbeConfig,

    /// Target environment overrides (for cross-configuration)
    pub target: TargetConfig,

    /// Toolchain overrides
    pub toolchain: ToolchainConfig,
}

/// Hardening mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningConfig {
    /// Enable the full hardening extension (speculative-execution
    /// mitigations, link hardening, extended mitigations)
    pub full: bool,
}

/// LTO mode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LtoConfig {
    /// Prefer ThinLTO over full LTO where the toolchain supports it
    pub thin: bool,
}

/// Capability probe settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProbeConfig {
    /// Per-probe timeout in seconds; a probe past this is treated as
    /// rejected. Unset means [`ProbeConfig::DEFAULT_TIMEOUT_SECS`].
    pub timeout_secs: Option<u64>,

    /// Force fresh probes, bypassing the persistent cache
    pub no_cache: bool,
}

impl ProbeConfig {
    /// Timeout applied when no config file sets one.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// The effective per-probe timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS))
    }
}

/// Target environment overrides.
///
/// When unset, the host environment is used. These exist so a
/// cross-configuration run can describe the environment the flags
/// are composed for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Target operating system (e.g., "linux", "macos", "windows")
    pub os: Option<String>,

    /// Target CPU architecture (e.g., "x86_64", "aarch64")
    pub arch: Option<String>,

    /// Target pointer width in bits (32 or 64)
    pub pointer_width: Option<u8>,
}

/// Toolchain overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Path to the C compiler driver (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let contents =
            toml::to_string_pretty(self).context("failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config over this one (the other takes precedence).
    ///
    /// Booleans merge with OR since all defaults are off; optional fields
    /// take the override when present.
    fn merge(mut self, over: Config) -> Self {
        self.hardening.full |= over.hardening.full;
        self.lto.thin |= over.lto.thin;
        self.probe.no_cache |= over.probe.no_cache;
        if over.probe.timeout_secs.is_some() {
            self.probe.timeout_secs = over.probe.timeout_secs;
        }
        if over.target.os.is_some() {
            self.target.os = over.target.os;
        }
        if over.target.arch.is_some() {
            self.target.arch = over.target.arch;
        }
        if over.target.pointer_width.is_some() {
            self.target.pointer_width = over.target.pointer_width;
        }
        if over.toolchain.cc.is_some() {
            self.toolchain.cc = over.toolchain.cc;
        }
        self
    }
}

/// Load configuration, merging global and project files.
///
/// Project config overrides global config. Missing files fall back to
/// defaults with a warning only for unreadable (not absent) files.
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let global = Config::load_or_default(global_path);
    let project = Config::load_or_default(project_path);
    global.merge(project)
}
