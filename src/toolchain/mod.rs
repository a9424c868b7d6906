//! Toolchain description for flag composition.
//!
//! A [`ToolchainDescriptor`] captures everything the rule predicates and the
//! capability probe need to know about the active compiler: vendor family,
//! version, target OS, CPU architecture family, pointer width, and the
//! driver path used for trial compilations. It is established once at the
//! start of a configuration run and never mutated.

pub mod detect;

use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::util::hash::Fingerprint;

pub use detect::detect_toolchain;

/// The vendor family of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainVendor {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (macOS)
    AppleClang,
    /// Microsoft Visual C++
    Msvc,
    /// Anything else; no rule group currently applies
    Other,
}

impl ToolchainVendor {
    /// Get the vendor name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainVendor::Gcc => "gcc",
            ToolchainVendor::Clang => "clang",
            ToolchainVendor::AppleClang => "apple-clang",
            ToolchainVendor::Msvc => "msvc",
            ToolchainVendor::Other => "other",
        }
    }

    /// GCC, Clang, or Apple Clang: the drivers that share the GNU-style
    /// flag syntax the rule tables are written in.
    pub fn is_gnu_like(&self) -> bool {
        matches!(
            self,
            ToolchainVendor::Gcc | ToolchainVendor::Clang | ToolchainVendor::AppleClang
        )
    }

    /// Clang or Apple Clang.
    pub fn is_clang_family(&self) -> bool {
        matches!(self, ToolchainVendor::Clang | ToolchainVendor::AppleClang)
    }
}

impl std::fmt::Display for ToolchainVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Linux,
    Macos,
    Windows,
    Other,
}

impl TargetOs {
    /// Classify an OS name string (as found in `std::env::consts::OS`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => TargetOs::Linux,
            "macos" => TargetOs::Macos,
            "windows" => TargetOs::Windows,
            _ => TargetOs::Other,
        }
    }

    /// Get the OS name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Linux => "linux",
            TargetOs::Macos => "macos",
            TargetOs::Windows => "windows",
            TargetOs::Other => "other",
        }
    }
}

impl std::fmt::Display for TargetOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target CPU architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchFamily {
    /// 32-bit x86
    X86,
    /// x86-64 / AMD64
    #[serde(alias = "amd64")]
    X86_64,
    /// 64-bit ARM
    #[serde(alias = "arm64")]
    Aarch64,
    /// 32-bit ARM
    Arm,
    Other,
}

impl ArchFamily {
    /// Classify an architecture name string (as found in
    /// `std::env::consts::ARCH` or a target triple).
    pub fn from_name(name: &str) -> Self {
        match name {
            "x86" | "i586" | "i686" => ArchFamily::X86,
            "x86_64" | "amd64" => ArchFamily::X86_64,
            "aarch64" | "arm64" => ArchFamily::Aarch64,
            "arm" | "armv7" => ArchFamily::Arm,
            _ => ArchFamily::Other,
        }
    }

    /// Get the architecture name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchFamily::X86 => "x86",
            ArchFamily::X86_64 => "x86_64",
            ArchFamily::Aarch64 => "aarch64",
            ArchFamily::Arm => "arm",
            ArchFamily::Other => "other",
        }
    }

    /// x86 or x86-64.
    pub fn is_x86_family(&self) -> bool {
        matches!(self, ArchFamily::X86 | ArchFamily::X86_64)
    }

    /// 64-bit ARM.
    pub fn is_aarch64_family(&self) -> bool {
        matches!(self, ArchFamily::Aarch64)
    }
}

impl std::fmt::Display for ArchFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable description of the active toolchain and target environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainDescriptor {
    /// Vendor family
    pub vendor: ToolchainVendor,

    /// Compiler version; `0.0.0` when the version could not be determined
    pub version: Version,

    /// Target operating system
    pub os: TargetOs,

    /// Target CPU architecture family
    pub arch: ArchFamily,

    /// Target pointer width in bits (32 or 64)
    pub pointer_width: u8,

    /// Compiler driver used for capability probing
    pub cc: PathBuf,
}

impl ToolchainDescriptor {
    /// Create a descriptor with an explicit environment.
    pub fn new(
        vendor: ToolchainVendor,
        version: Version,
        os: TargetOs,
        arch: ArchFamily,
        pointer_width: u8,
        cc: impl Into<PathBuf>,
    ) -> Self {
        ToolchainDescriptor {
            vendor,
            version,
            os,
            arch,
            pointer_width,
            cc: cc.into(),
        }
    }

    /// Get the compiler driver path.
    pub fn compiler_path(&self) -> &Path {
        &self.cc
    }

    /// Whether the vendor has any applicable rule groups at all.
    pub fn is_supported(&self) -> bool {
        self.vendor.is_gnu_like()
    }

    /// GCC at or above the given major version.
    pub fn is_gcc_at_least(&self, major: u64) -> bool {
        self.vendor == ToolchainVendor::Gcc && self.version.major >= major
    }

    /// Identity fingerprint for cache invalidation.
    ///
    /// Any change to the descriptor produces a different fingerprint,
    /// which discards previously persisted probe results.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(self.vendor.as_str())
            .update_str(&self.version.to_string())
            .update_str(self.os.as_str())
            .update_str(self.arch.as_str())
            .update_u64(self.pointer_width as u64)
            .update_str(&self.cc.to_string_lossy());
        fp.finish_short()
    }
}

impl std::fmt::Display for ToolchainDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({}, {}, {}-bit)",
            self.vendor, self.version, self.os, self.arch, self.pointer_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gcc_linux_x86_64() -> ToolchainDescriptor {
        ToolchainDescriptor::new(
            ToolchainVendor::Gcc,
            Version::new(13, 2, 0),
            TargetOs::Linux,
            ArchFamily::X86_64,
            64,
            "/usr/bin/gcc",
        )
    }

    #[test]
    fn test_vendor_families() {
        assert!(ToolchainVendor::Gcc.is_gnu_like());
        assert!(ToolchainVendor::Clang.is_gnu_like());
        assert!(ToolchainVendor::AppleClang.is_gnu_like());
        assert!(!ToolchainVendor::Msvc.is_gnu_like());
        assert!(!ToolchainVendor::Other.is_gnu_like());

        assert!(ToolchainVendor::AppleClang.is_clang_family());
        assert!(!ToolchainVendor::Gcc.is_clang_family());
    }

    #[test]
    fn test_arch_classification() {
        assert_eq!(ArchFamily::from_name("x86_64"), ArchFamily::X86_64);
        assert_eq!(ArchFamily::from_name("amd64"), ArchFamily::X86_64);
        assert_eq!(ArchFamily::from_name("arm64"), ArchFamily::Aarch64);
        assert_eq!(ArchFamily::from_name("i686"), ArchFamily::X86);
        assert_eq!(ArchFamily::from_name("riscv64"), ArchFamily::Other);

        assert!(ArchFamily::X86.is_x86_family());
        assert!(ArchFamily::X86_64.is_x86_family());
        assert!(!ArchFamily::Aarch64.is_x86_family());
        assert!(ArchFamily::Aarch64.is_aarch64_family());
    }

    #[test]
    fn test_gcc_version_gate() {
        let tc = gcc_linux_x86_64();
        assert!(tc.is_gcc_at_least(10));
        assert!(tc.is_gcc_at_least(13));
        assert!(!tc.is_gcc_at_least(14));

        let mut clang = gcc_linux_x86_64();
        clang.vendor = ToolchainVendor::Clang;
        assert!(!clang.is_gcc_at_least(10));
    }

    #[test]
    fn test_fingerprint_changes_with_identity() {
        let a = gcc_linux_x86_64();
        let mut b = gcc_linux_x86_64();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.version = Version::new(14, 1, 0);
        assert_ne!(a.fingerprint(), b.fingerprint());

        let mut c = gcc_linux_x86_64();
        c.arch = ArchFamily::Aarch64;
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
