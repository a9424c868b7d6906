//! Toolchain detection functions.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use semver::Version;

use crate::util::config::Config;
use crate::util::process::ProcessBuilder;

use super::{ArchFamily, TargetOs, ToolchainDescriptor, ToolchainVendor};

/// Detect the active toolchain and target environment.
///
/// The compiler driver is located with the following priority:
/// 1. Config override (`[toolchain] cc` in `.bulwark/config.toml` or
///    `~/.bulwark/config.toml`)
/// 2. `CC` environment variable
/// 3. The first of `cc`, `gcc`, `clang` found on PATH
///
/// OS, architecture, and pointer width default to the host and can be
/// overridden through the `[target]` config section for cross-configuration.
pub fn detect_toolchain(config: &Config) -> Result<ToolchainDescriptor> {
    let cc = find_compiler(config)?;
    let vendor = detect_compiler_family(&cc);
    let version = detect_version(&cc).unwrap_or_else(|| Version::new(0, 0, 0));

    let os = match &config.target.os {
        Some(name) => TargetOs::from_name(name),
        None => TargetOs::from_name(std::env::consts::OS),
    };
    let arch = match &config.target.arch {
        Some(name) => ArchFamily::from_name(name),
        None => ArchFamily::from_name(std::env::consts::ARCH),
    };
    let pointer_width = config
        .target
        .pointer_width
        .unwrap_or(if cfg!(target_pointer_width = "32") { 32 } else { 64 });

    let descriptor = ToolchainDescriptor::new(vendor, version, os, arch, pointer_width, cc);
    tracing::debug!("detected toolchain: {}", descriptor);
    Ok(descriptor)
}

/// Locate the C compiler driver.
fn find_compiler(config: &Config) -> Result<PathBuf> {
    use which::which;

    if let Some(cc) = &config.toolchain.cc {
        if cc.exists() {
            return Ok(cc.clone());
        }
        tracing::warn!("Configured C compiler not found: {}", cc.display());
    }

    if let Ok(cc_env) = std::env::var("CC") {
        // Accept either an absolute path or a name resolvable via PATH
        let as_path = PathBuf::from(&cc_env);
        if as_path.is_absolute() && as_path.exists() {
            return Ok(as_path);
        }
        if let Ok(p) = which(&cc_env) {
            return Ok(p);
        }
        tracing::warn!("CC is set to `{}` but it was not found", cc_env);
    }

    match which("cc")
        .or_else(|_| which("gcc"))
        .or_else(|_| which("clang"))
    {
        Ok(p) => Ok(p),
        Err(_) => bail!(
            "no C compiler found\n\
             \n\
             Bulwark requires a C compiler driver (gcc or clang) for\n\
             capability probing. Set the CC environment variable or\n\
             configure `[toolchain] cc` in .bulwark/config.toml."
        ),
    }
}

/// Detect whether the compiler is GCC, Clang, Apple Clang, or MSVC.
fn detect_compiler_family(cc: &Path) -> ToolchainVendor {
    // Check binary name first
    let name = cc
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if name.contains("clang") {
        // Could be Apple Clang or regular Clang
        return detect_clang_variant(cc);
    } else if name.contains("gcc") || name.contains("g++") {
        return ToolchainVendor::Gcc;
    } else if name == "cl" || name == "cl.exe" {
        return ToolchainVendor::Msvc;
    }

    // Try to detect from --version output
    if let Some(banner) = version_banner(cc) {
        let banner = banner.to_lowercase();
        if banner.contains("clang") {
            return detect_clang_variant(cc);
        } else if banner.contains("gcc") || banner.contains("free software foundation") {
            return ToolchainVendor::Gcc;
        } else if banner.contains("microsoft") {
            return ToolchainVendor::Msvc;
        }
        return ToolchainVendor::Other;
    }

    ToolchainVendor::Other
}

/// Detect if Clang is Apple Clang or regular Clang.
fn detect_clang_variant(cc: &Path) -> ToolchainVendor {
    if let Some(banner) = version_banner(cc) {
        if banner.to_lowercase().contains("apple") {
            return ToolchainVendor::AppleClang;
        }
    }

    ToolchainVendor::Clang
}

/// Capture the first line of `cc --version`.
fn version_banner(cc: &Path) -> Option<String> {
    let output = ProcessBuilder::new(cc).arg("--version").exec().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().map(|l| l.to_string())
}

/// Detect the compiler version.
///
/// Tries `-dumpversion` (stable output on both GCC and Clang), falling
/// back to scanning the `--version` banner for a dotted version token.
fn detect_version(cc: &Path) -> Option<Version> {
    if let Ok(output) = ProcessBuilder::new(cc).arg("-dumpversion").exec() {
        if output.status.success() {
            let raw = String::from_utf8_lossy(&output.stdout);
            if let Some(version) = parse_version(raw.trim()) {
                return Some(version);
            }
        }
    }

    let banner = version_banner(cc)?;
    banner.split_whitespace().find_map(parse_version)
}

/// Parse a loosely formatted version string ("13", "13.2", "13.2.0") into
/// a semver version, padding missing components with zero.
fn parse_version(s: &str) -> Option<Version> {
    let core = s
        .split(|c: char| c == '-' || c == '+')
        .next()
        .unwrap_or(s);

    let mut parts = core.split('.');
    let major = parts.next()?.parse::<u64>().ok()?;
    let minor = parts.next().and_then(|p| p.parse::<u64>().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse::<u64>().ok()).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_full() {
        assert_eq!(parse_version("13.2.0"), Some(Version::new(13, 2, 0)));
    }

    #[test]
    fn test_parse_version_partial() {
        assert_eq!(parse_version("13"), Some(Version::new(13, 0, 0)));
        assert_eq!(parse_version("13.2"), Some(Version::new(13, 2, 0)));
    }

    #[test]
    fn test_parse_version_with_suffix() {
        assert_eq!(parse_version("17.0.6-1ubuntu1"), Some(Version::new(17, 0, 6)));
        assert_eq!(parse_version("4.2.1+rev5"), Some(Version::new(4, 2, 1)));
    }

    #[test]
    fn test_parse_version_rejects_garbage() {
        assert_eq!(parse_version("version"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_family_from_binary_name() {
        assert_eq!(
            detect_compiler_family(Path::new("/opt/bin/x86_64-linux-gnu-gcc")),
            ToolchainVendor::Gcc
        );
        // Nonexistent clang binary: name match wins, banner probe fails,
        // so the non-Apple variant is assumed.
        assert_eq!(
            detect_compiler_family(Path::new("/nonexistent/clang-17")),
            ToolchainVendor::Clang
        );
    }
}
