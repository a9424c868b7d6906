//! Declarative flag rule tables.
//!
//! Every candidate flag lives in exactly one rule group, guarded by a
//! pure predicate over the toolchain descriptor, the mode toggles, and
//! (for position independence) the target kind. The composer evaluates
//! these tables uniformly; adding support for a new toolchain quirk is
//! a predicate change here, not a branch somewhere else.
//!
//! Rule order within a table is the order flags are emitted in, which
//! is what ends up on the command line.

use serde::{Deserialize, Serialize};

use crate::core::target::TargetKind;
use crate::toolchain::{ToolchainDescriptor, ToolchainVendor};

use super::probe::FlagCategory;

/// User-controlled mode toggles affecting rule predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    /// Enable the full hardening extension (speculative-execution
    /// mitigations, link hardening, extended mitigations)
    pub full_hardening: bool,

    /// Prefer ThinLTO where the toolchain has it
    pub thin_lto: bool,
}

/// Named rule groups, each serving one hardening or optimization purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleGroup {
    /// Diagnostic-strictness flags
    Warnings,
    /// Stack protector and stack-clash protection
    StackProtection,
    /// Aliasing, common symbols, auto-var-init, ARM branch protection
    ControlFlow,
    /// Spectre-class mitigations (full mode only)
    SpeculativeMitigation,
    /// RELRO, non-executable stack, as-needed linking (full mode only)
    LinkHardening,
    /// Straight-line speculation, zeroed call-used registers, CET linker
    /// flags (full mode only)
    ExtendedMitigation,
    /// PIE/PIC compile flags and the `-pie` link flag
    PositionIndependence,
    /// Fortification and standard-library assertion definitions
    /// (attached without probing)
    HardeningDefinitions,
    /// Link-time optimization, full and thin variants
    Lto,
}

impl RuleGroup {
    /// Get the group name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleGroup::Warnings => "warnings",
            RuleGroup::StackProtection => "stack-protection",
            RuleGroup::ControlFlow => "control-flow",
            RuleGroup::SpeculativeMitigation => "speculative-mitigation",
            RuleGroup::LinkHardening => "link-hardening",
            RuleGroup::ExtendedMitigation => "extended-mitigation",
            RuleGroup::PositionIndependence => "position-independence",
            RuleGroup::HardeningDefinitions => "hardening-definitions",
            RuleGroup::Lto => "lto",
        }
    }
}

impl std::fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a predicate may look at.
///
/// `kind` is only set when composing for a concrete target; scope-level
/// composition (IPO) leaves it `None`, and kind-sensitive rules treat
/// that as "does not apply".
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The active toolchain
    pub toolchain: &'a ToolchainDescriptor,

    /// Mode toggles
    pub modes: Modes,

    /// Kind of the target being configured, when composing per-target
    pub kind: Option<TargetKind>,
}

impl<'a> RuleContext<'a> {
    /// Context for scope-level composition.
    pub fn for_scope(toolchain: &'a ToolchainDescriptor, modes: Modes) -> Self {
        RuleContext {
            toolchain,
            modes,
            kind: None,
        }
    }

    /// Context for per-target composition.
    pub fn for_target(
        toolchain: &'a ToolchainDescriptor,
        modes: Modes,
        kind: TargetKind,
    ) -> Self {
        RuleContext {
            toolchain,
            modes,
            kind: Some(kind),
        }
    }
}

/// A candidate flag and the predicate deciding whether it is even worth
/// probing in the current environment.
pub struct Rule {
    /// Literal flag text handed to the toolchain
    pub flag: &'static str,

    /// Property category (and thereby probe binding)
    pub category: FlagCategory,

    /// Whether acceptance is verified by a capability probe; definitions
    /// are attached unconditionally once the vendor matches
    pub probed: bool,

    /// Pure predicate over toolchain, modes, and target kind
    pub applies: fn(&RuleContext) -> bool,
}

// Predicate helpers. Each is total and deterministic; composing the
// same context twice always yields the same candidate list.

fn gnu_like(ctx: &RuleContext) -> bool {
    ctx.toolchain.vendor.is_gnu_like()
}

fn gnu_like_not_apple(ctx: &RuleContext) -> bool {
    ctx.toolchain.vendor.is_gnu_like() && ctx.toolchain.vendor != ToolchainVendor::AppleClang
}

fn aarch64_branch_protection(ctx: &RuleContext) -> bool {
    ctx.toolchain.arch.is_aarch64_family() && gnu_like_not_apple(ctx)
}

fn x86_full_mode(ctx: &RuleContext) -> bool {
    ctx.modes.full_hardening && ctx.toolchain.arch.is_x86_family() && gnu_like_not_apple(ctx)
}

fn x86_full_mode_gcc(ctx: &RuleContext) -> bool {
    x86_full_mode(ctx) && ctx.toolchain.vendor == ToolchainVendor::Gcc
}

fn x86_full_mode_clang(ctx: &RuleContext) -> bool {
    x86_full_mode(ctx) && ctx.toolchain.vendor == ToolchainVendor::Clang
}

fn speculative_load_hardening(ctx: &RuleContext) -> bool {
    // Clang-only, and only meaningful on 64-bit x86.
    x86_full_mode_clang(ctx) && ctx.toolchain.pointer_width == 64
}

fn linux_full_mode(ctx: &RuleContext) -> bool {
    ctx.modes.full_hardening
        && ctx.toolchain.os == crate::toolchain::TargetOs::Linux
        && gnu_like(ctx)
}

fn full_mode(ctx: &RuleContext) -> bool {
    ctx.modes.full_hardening && gnu_like(ctx)
}

fn cet_linker(ctx: &RuleContext) -> bool {
    // Indirect-branch-tracking and shadow-stack markers are x86 ELF features.
    linux_full_mode(ctx) && ctx.toolchain.arch.is_x86_family()
}

fn pie_compile(ctx: &RuleContext) -> bool {
    gnu_like(ctx) && ctx.kind == Some(TargetKind::Exe)
}

fn pic_compile(ctx: &RuleContext) -> bool {
    // Shared objects need PIC unconditionally; static libraries get it
    // too so they can be folded into shared objects later.
    gnu_like(ctx) && ctx.kind.is_some_and(|k| k.is_library())
}

fn pie_link(ctx: &RuleContext) -> bool {
    pie_compile(ctx) && ctx.toolchain.os == crate::toolchain::TargetOs::Linux
}

fn thin_lto(ctx: &RuleContext) -> bool {
    ctx.modes.thin_lto && ctx.toolchain.vendor.is_clang_family()
}

fn parallel_lto_fallback(ctx: &RuleContext) -> bool {
    // GCC has no ThinLTO; a thin-mode request falls back to the
    // parallel/auto variant where the version supports it.
    ctx.modes.thin_lto && ctx.toolchain.is_gcc_at_least(10)
}

fn full_lto(ctx: &RuleContext) -> bool {
    if !gnu_like(ctx) {
        return false;
    }
    if !ctx.modes.thin_lto {
        return true;
    }
    // Thin mode on a toolchain with neither ThinLTO nor parallel LTO
    // still gets plain full LTO rather than nothing.
    !thin_lto(ctx) && !parallel_lto_fallback(ctx)
}

fn fat_lto_objects(ctx: &RuleContext) -> bool {
    ctx.toolchain.vendor == ToolchainVendor::Gcc && !ctx.modes.thin_lto
}

const WARNINGS: &[Rule] = &[
    Rule { flag: "-Wall", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-Wextra", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-Wformat=2", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-Wimplicit-fallthrough", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
];

const STACK_PROTECTION: &[Rule] = &[
    Rule { flag: "-fstack-protector-strong", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    // Apple's linker rejects stack-clash sections.
    Rule { flag: "-fstack-clash-protection", category: FlagCategory::CompileOption, probed: true, applies: gnu_like_not_apple },
];

const CONTROL_FLOW: &[Rule] = &[
    Rule { flag: "-fno-strict-aliasing", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-fno-common", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-ftrivial-auto-var-init=zero", category: FlagCategory::CompileOption, probed: true, applies: gnu_like },
    Rule { flag: "-mbranch-protection=standard", category: FlagCategory::CompileOption, probed: true, applies: aarch64_branch_protection },
];

const SPECULATIVE_MITIGATION: &[Rule] = &[
    Rule { flag: "-fcf-protection=full", category: FlagCategory::CompileOption, probed: true, applies: x86_full_mode },
    Rule { flag: "-mretpoline", category: FlagCategory::CompileOption, probed: true, applies: x86_full_mode_clang },
    Rule { flag: "-mindirect-branch=thunk", category: FlagCategory::CompileOption, probed: true, applies: x86_full_mode_gcc },
    Rule { flag: "-mfunction-return=thunk", category: FlagCategory::CompileOption, probed: true, applies: x86_full_mode_gcc },
    Rule { flag: "-mspeculative-load-hardening", category: FlagCategory::CompileOption, probed: true, applies: speculative_load_hardening },
];

const LINK_HARDENING: &[Rule] = &[
    Rule { flag: "-Wl,-z,relro", category: FlagCategory::LinkOption, probed: true, applies: linux_full_mode },
    Rule { flag: "-Wl,-z,now", category: FlagCategory::LinkOption, probed: true, applies: linux_full_mode },
    Rule { flag: "-Wl,-z,noexecstack", category: FlagCategory::LinkOption, probed: true, applies: linux_full_mode },
    Rule { flag: "-Wl,--as-needed", category: FlagCategory::LinkOption, probed: true, applies: linux_full_mode },
    Rule { flag: "-Wl,--sort-common", category: FlagCategory::LinkOption, probed: true, applies: linux_full_mode },
];

const EXTENDED_MITIGATION: &[Rule] = &[
    Rule { flag: "-mharden-sls=all", category: FlagCategory::CompileOption, probed: true, applies: full_mode },
    Rule { flag: "-fzero-call-used-regs=used-gpr", category: FlagCategory::CompileOption, probed: true, applies: full_mode },
    Rule { flag: "-Wl,-z,ibt", category: FlagCategory::LinkOption, probed: true, applies: cet_linker },
    Rule { flag: "-Wl,-z,shstk", category: FlagCategory::LinkOption, probed: true, applies: cet_linker },
];

const POSITION_INDEPENDENCE: &[Rule] = &[
    Rule { flag: "-fPIE", category: FlagCategory::CompileOption, probed: true, applies: pie_compile },
    Rule { flag: "-fPIC", category: FlagCategory::CompileOption, probed: true, applies: pic_compile },
    Rule { flag: "-pie", category: FlagCategory::LinkOption, probed: true, applies: pie_link },
];

const HARDENING_DEFINITIONS: &[Rule] = &[
    Rule { flag: "_FORTIFY_SOURCE=3", category: FlagCategory::CompileDefinition, probed: false, applies: gnu_like },
    Rule { flag: "_GLIBCXX_ASSERTIONS", category: FlagCategory::CompileDefinition, probed: false, applies: gnu_like },
];

const LTO: &[Rule] = &[
    Rule { flag: "-flto=thin", category: FlagCategory::CompileOption, probed: true, applies: thin_lto },
    Rule { flag: "-flto=thin", category: FlagCategory::LinkOption, probed: true, applies: thin_lto },
    Rule { flag: "-flto=auto", category: FlagCategory::CompileOption, probed: true, applies: parallel_lto_fallback },
    Rule { flag: "-flto=auto", category: FlagCategory::LinkOption, probed: true, applies: parallel_lto_fallback },
    Rule { flag: "-flto", category: FlagCategory::CompileOption, probed: true, applies: full_lto },
    Rule { flag: "-flto", category: FlagCategory::LinkOption, probed: true, applies: full_lto },
    Rule { flag: "-ffat-lto-objects", category: FlagCategory::CompileOption, probed: true, applies: fat_lto_objects },
];

/// The rule table for a group, in declaration (emission) order.
pub fn rules_for(group: RuleGroup) -> &'static [Rule] {
    match group {
        RuleGroup::Warnings => WARNINGS,
        RuleGroup::StackProtection => STACK_PROTECTION,
        RuleGroup::ControlFlow => CONTROL_FLOW,
        RuleGroup::SpeculativeMitigation => SPECULATIVE_MITIGATION,
        RuleGroup::LinkHardening => LINK_HARDENING,
        RuleGroup::ExtendedMitigation => EXTENDED_MITIGATION,
        RuleGroup::PositionIndependence => POSITION_INDEPENDENCE,
        RuleGroup::HardeningDefinitions => HARDENING_DEFINITIONS,
        RuleGroup::Lto => LTO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{ArchFamily, TargetOs};
    use semver::Version;

    fn toolchain(
        vendor: ToolchainVendor,
        os: TargetOs,
        arch: ArchFamily,
        width: u8,
    ) -> ToolchainDescriptor {
        ToolchainDescriptor::new(vendor, Version::new(13, 0, 0), os, arch, width, "cc")
    }

    fn surviving(group: RuleGroup, ctx: &RuleContext) -> Vec<&'static str> {
        rules_for(group)
            .iter()
            .filter(|r| (r.applies)(ctx))
            .map(|r| r.flag)
            .collect()
    }

    #[test]
    fn test_gcc_linux_default_mode_stack_protection() {
        let tc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);

        let flags = surviving(RuleGroup::StackProtection, &ctx);
        assert!(flags.contains(&"-fstack-protector-strong"));
        assert!(flags.contains(&"-fstack-clash-protection"));
    }

    #[test]
    fn test_full_mode_only_flags_absent_by_default() {
        let tc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);

        assert!(surviving(RuleGroup::SpeculativeMitigation, &ctx).is_empty());
        assert!(surviving(RuleGroup::ExtendedMitigation, &ctx).is_empty());
        assert!(surviving(RuleGroup::LinkHardening, &ctx).is_empty());
    }

    #[test]
    fn test_predicate_conjunction() {
        // Linux + x86_64 + full-hardening must all hold for link hardening.
        let modes = Modes { full_hardening: true, thin_lto: false };

        let tc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&tc, modes, TargetKind::Exe);
        assert!(surviving(RuleGroup::LinkHardening, &ctx).contains(&"-Wl,-z,relro"));

        // Drop full mode
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        assert!(surviving(RuleGroup::LinkHardening, &ctx).is_empty());

        // Drop Linux
        let mac = toolchain(ToolchainVendor::Clang, TargetOs::Macos, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&mac, modes, TargetKind::Exe);
        assert!(surviving(RuleGroup::LinkHardening, &ctx).is_empty());
    }

    #[test]
    fn test_speculative_load_hardening_requires_64bit_clang() {
        let modes = Modes { full_hardening: true, thin_lto: false };

        let clang64 = toolchain(ToolchainVendor::Clang, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&clang64, modes, TargetKind::Exe);
        assert!(surviving(RuleGroup::SpeculativeMitigation, &ctx)
            .contains(&"-mspeculative-load-hardening"));

        let clang32 = toolchain(ToolchainVendor::Clang, TargetOs::Linux, ArchFamily::X86, 32);
        let ctx = RuleContext::for_target(&clang32, modes, TargetKind::Exe);
        assert!(!surviving(RuleGroup::SpeculativeMitigation, &ctx)
            .contains(&"-mspeculative-load-hardening"));

        // Apple Clang is excluded regardless of mode flags.
        let apple = toolchain(ToolchainVendor::AppleClang, TargetOs::Macos, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&apple, modes, TargetKind::Exe);
        assert!(surviving(RuleGroup::SpeculativeMitigation, &ctx).is_empty());
    }

    #[test]
    fn test_apple_clang_arm64_branch_protection_excluded() {
        // The architecture predicate alone would include branch
        // protection; the Apple exclusion must win.
        let apple = toolchain(ToolchainVendor::AppleClang, TargetOs::Macos, ArchFamily::Aarch64, 64);
        let ctx = RuleContext::for_target(&apple, Modes::default(), TargetKind::Exe);
        assert!(!surviving(RuleGroup::ControlFlow, &ctx).contains(&"-mbranch-protection=standard"));

        let linux_arm = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::Aarch64, 64);
        let ctx = RuleContext::for_target(&linux_arm, Modes::default(), TargetKind::Exe);
        assert!(surviving(RuleGroup::ControlFlow, &ctx).contains(&"-mbranch-protection=standard"));
    }

    #[test]
    fn test_position_independence_by_kind() {
        let tc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);

        let exe = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        let flags = surviving(RuleGroup::PositionIndependence, &exe);
        assert_eq!(flags, vec!["-fPIE", "-pie"]);

        let shared = RuleContext::for_target(&tc, Modes::default(), TargetKind::SharedLib);
        let flags = surviving(RuleGroup::PositionIndependence, &shared);
        assert_eq!(flags, vec!["-fPIC"]);

        // -pie is Linux-only even for executables.
        let mac = toolchain(ToolchainVendor::Clang, TargetOs::Macos, ArchFamily::Aarch64, 64);
        let exe = RuleContext::for_target(&mac, Modes::default(), TargetKind::Exe);
        assert!(!surviving(RuleGroup::PositionIndependence, &exe).contains(&"-pie"));
    }

    #[test]
    fn test_lto_variant_selection() {
        let thin = Modes { full_hardening: false, thin_lto: true };

        // Clang with thin mode: thin variant, no plain -flto.
        let clang = toolchain(ToolchainVendor::Clang, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_scope(&clang, thin);
        let flags = surviving(RuleGroup::Lto, &ctx);
        assert!(flags.contains(&"-flto=thin"));
        assert!(!flags.contains(&"-flto"));
        assert!(!flags.contains(&"-flto=auto"));

        // GCC >= 10 with thin mode: parallel/auto fallback.
        let gcc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_scope(&gcc, thin);
        let flags = surviving(RuleGroup::Lto, &ctx);
        assert!(flags.contains(&"-flto=auto"));
        assert!(!flags.contains(&"-flto=thin"));
        assert!(!flags.contains(&"-flto"));

        // Old GCC with thin mode: plain full LTO.
        let mut old_gcc = gcc.clone();
        old_gcc.version = Version::new(8, 0, 0);
        let ctx = RuleContext::for_scope(&old_gcc, thin);
        let flags = surviving(RuleGroup::Lto, &ctx);
        assert!(flags.contains(&"-flto"));
        assert!(!flags.contains(&"-flto=auto"));

        // GCC without thin mode: full LTO plus fat objects.
        let ctx = RuleContext::for_scope(&gcc, Modes::default());
        let flags = surviving(RuleGroup::Lto, &ctx);
        assert!(flags.contains(&"-flto"));
        assert!(flags.contains(&"-ffat-lto-objects"));
    }

    #[test]
    fn test_unsupported_vendor_composes_nothing() {
        let msvc = toolchain(ToolchainVendor::Msvc, TargetOs::Windows, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&msvc, Modes { full_hardening: true, thin_lto: true }, TargetKind::Exe);

        for group in [
            RuleGroup::Warnings,
            RuleGroup::StackProtection,
            RuleGroup::ControlFlow,
            RuleGroup::SpeculativeMitigation,
            RuleGroup::LinkHardening,
            RuleGroup::ExtendedMitigation,
            RuleGroup::PositionIndependence,
            RuleGroup::HardeningDefinitions,
            RuleGroup::Lto,
        ] {
            assert!(surviving(group, &ctx).is_empty(), "group {} not empty", group);
        }
    }

    #[test]
    fn test_predicates_deterministic() {
        let tc = toolchain(ToolchainVendor::Gcc, TargetOs::Linux, ArchFamily::X86_64, 64);
        let ctx = RuleContext::for_target(&tc, Modes { full_hardening: true, thin_lto: false }, TargetKind::Exe);

        for group in [RuleGroup::Warnings, RuleGroup::LinkHardening, RuleGroup::Lto] {
            assert_eq!(surviving(group, &ctx), surviving(group, &ctx));
        }
    }
}
