//! The flag-composition engine.
//!
//! This module decides, per target, which compiler/linker capabilities
//! are both supported by the active toolchain and applicable to the
//! current environment, then applies them exactly once. The flow for
//! each entry point is: rule tables -> predicate filter -> probe cache
//! (running trial compilations on misses) -> append to the target's
//! property lists.
//!
//! Nothing in here is a fatal error: unsupported capabilities and
//! unsupported vendors degrade to smaller (possibly empty) flag sets
//! with warnings.

pub mod apply;
pub mod cache;
pub mod compose;
pub mod probe;
pub mod rules;

use crate::core::target::{
    BuildScope, BuildTarget, PropertyContainer, COMPILE_DEFINITIONS, COMPILE_OPTIONS, IPO,
    LINK_OPTIONS,
};
use crate::toolchain::ToolchainDescriptor;

pub use apply::Applier;
pub use cache::{CacheMode, ProbeCache};
pub use compose::{compose, compose_set, ComposedFlag, ComposedSet};
pub use probe::{CapabilityProbe, CompilerProbe, FlagCategory};
pub use rules::{rules_for, Modes, Rule, RuleContext, RuleGroup};

/// Rule groups Harden always runs, in application order.
const BASE_HARDENING_GROUPS: &[RuleGroup] = &[
    RuleGroup::Warnings,
    RuleGroup::StackProtection,
    RuleGroup::ControlFlow,
];

/// Rule groups added by full-hardening mode.
const FULL_HARDENING_GROUPS: &[RuleGroup] = &[
    RuleGroup::SpeculativeMitigation,
    RuleGroup::LinkHardening,
    RuleGroup::ExtendedMitigation,
];

/// Outcome of hardening one target.
#[derive(Debug, Clone, Default)]
pub struct HardenSummary {
    /// Compiler flags appended
    pub compile_flags: usize,

    /// Linker flags appended
    pub link_flags: usize,

    /// Preprocessor definitions appended
    pub definitions: usize,
}

impl HardenSummary {
    /// Total entries appended.
    pub fn total(&self) -> usize {
        self.compile_flags + self.link_flags + self.definitions
    }
}

/// Outcome of an IPO entry point.
#[derive(Debug, Clone, Default)]
pub struct IpoSummary {
    /// Whether the toolchain supports whole-program optimization at all
    pub supported: bool,

    /// Compiler flags appended
    pub compile_flags: usize,

    /// Linker flags appended
    pub link_flags: usize,
}

/// One configuration run over a fixed toolchain.
///
/// State shared between targets is limited to the probe cache (probe
/// results depend only on the toolchain) and the applier's bookkeeping;
/// configuring one target never changes another's flags.
pub struct Engine {
    toolchain: ToolchainDescriptor,
    modes: Modes,
    cache: ProbeCache,
    probe: Box<dyn CapabilityProbe>,
    applier: Applier,
    warned_unsupported: bool,
}

impl Engine {
    /// Create an engine probing through the toolchain's own driver.
    pub fn new(toolchain: ToolchainDescriptor, modes: Modes, cache: ProbeCache) -> Self {
        let probe = Box::new(CompilerProbe::new(&toolchain));
        Self::with_probe(toolchain, modes, cache, probe)
    }

    /// Create an engine with an injected probe (used by tests and by
    /// embeddings that already know their toolchain's capabilities).
    pub fn with_probe(
        toolchain: ToolchainDescriptor,
        modes: Modes,
        cache: ProbeCache,
        probe: Box<dyn CapabilityProbe>,
    ) -> Self {
        Engine {
            toolchain,
            modes,
            cache,
            probe,
            applier: Applier::new(),
            warned_unsupported: false,
        }
    }

    /// The toolchain this run composes for.
    pub fn toolchain(&self) -> &ToolchainDescriptor {
        &self.toolchain
    }

    /// The active mode toggles.
    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// The probe cache, for persistence by the caller.
    pub fn cache(&self) -> &ProbeCache {
        &self.cache
    }

    fn warn_unsupported_vendor(&mut self) {
        if self.toolchain.is_supported() || self.warned_unsupported {
            return;
        }
        self.warned_unsupported = true;
        tracing::warn!(
            "no hardening or optimization rules apply to {} compilers; \
             continuing with an empty flag set",
            self.toolchain.vendor
        );
    }

    /// Harden one target.
    ///
    /// Runs the warnings, stack-protection, and control-flow groups, the
    /// full-mode groups when full hardening is on, and position
    /// independence, then attaches the fixed hardening definitions
    /// without probing. Safe to call for any number of distinct targets
    /// in a run; calling it twice for the same target appends nothing new.
    pub fn harden(&mut self, target: &mut dyn BuildTarget) -> HardenSummary {
        self.warn_unsupported_vendor();

        let ctx = RuleContext::for_target(&self.toolchain, self.modes, target.kind());
        let mut summary = HardenSummary::default();

        let mut groups: Vec<RuleGroup> = BASE_HARDENING_GROUPS.to_vec();
        if self.modes.full_hardening {
            groups.extend_from_slice(FULL_HARDENING_GROUPS);
        }
        groups.push(RuleGroup::PositionIndependence);

        for group in groups {
            let set = compose_set(group, &ctx, &self.cache, self.probe.as_ref());
            summary.compile_flags +=
                self.applier
                    .apply(target, COMPILE_OPTIONS, group, &set.compile);
            summary.link_flags += self.applier.apply(target, LINK_OPTIONS, group, &set.link);
        }

        // Fixed definitions: valid whenever the vendor matches, no probe.
        let set = compose_set(
            RuleGroup::HardeningDefinitions,
            &ctx,
            &self.cache,
            self.probe.as_ref(),
        );
        summary.definitions += self.applier.apply(
            target,
            COMPILE_DEFINITIONS,
            RuleGroup::HardeningDefinitions,
            &set.definitions,
        );

        tracing::info!(
            "hardened `{}`: {} compile, {} link, {} definitions",
            target.container_name(),
            summary.compile_flags,
            summary.link_flags,
            summary.definitions
        );
        summary
    }

    /// Check one flag against the toolchain, through the cache.
    pub fn check_flag(&self, flag: &str, category: FlagCategory) -> bool {
        self.cache.get_or_compute(flag, category, self.probe.as_ref())
    }

    /// Whether the toolchain supports whole-program optimization at all.
    ///
    /// A single capability check gates the whole LTO group.
    fn ipo_supported(&self) -> bool {
        self.toolchain.is_supported() && self.check_flag("-flto", FlagCategory::CompileOption)
    }

    fn apply_lto(&mut self, container: &mut dyn PropertyContainer) -> IpoSummary {
        let ctx = RuleContext::for_scope(&self.toolchain, self.modes);
        let set = compose_set(RuleGroup::Lto, &ctx, &self.cache, self.probe.as_ref());
        IpoSummary {
            supported: true,
            compile_flags: self
                .applier
                .apply(container, COMPILE_OPTIONS, RuleGroup::Lto, &set.compile),
            link_flags: self
                .applier
                .apply(container, LINK_OPTIONS, RuleGroup::Lto, &set.link),
        }
    }

    /// Enable whole-program optimization for the build scope.
    ///
    /// When the toolchain cannot do LTO at all, the group is skipped
    /// with a warning and the scope is left untouched.
    pub fn enable_ipo(&mut self, scope: &mut BuildScope) -> IpoSummary {
        self.warn_unsupported_vendor();

        if !self.ipo_supported() {
            tracing::warn!(
                "whole-program optimization is not supported by this toolchain; skipping"
            );
            return IpoSummary::default();
        }

        let summary = self.apply_lto(scope);
        tracing::info!(
            "enabled whole-program optimization for the scope: {} compile, {} link",
            summary.compile_flags,
            summary.link_flags
        );
        summary
    }

    /// Enable whole-program optimization for one target, bypassing the
    /// scope decision. Other targets are unaffected.
    pub fn enable_ipo_for_target(&mut self, target: &mut dyn BuildTarget) -> IpoSummary {
        self.warn_unsupported_vendor();

        if !self.ipo_supported() {
            tracing::warn!(
                "whole-program optimization is not supported by this toolchain; \
                 ignoring per-target request for `{}`",
                target.container_name()
            );
            return IpoSummary::default();
        }

        let summary = self.apply_lto(target);
        target.set_property(IPO, vec!["on".to_string()]);
        summary
    }

    /// Opt one target out of the scope-wide IPO decision.
    ///
    /// Flags are append-only, so this records an override marker for the
    /// surrounding build system rather than removing anything.
    pub fn disable_ipo_for_target(&mut self, target: &mut dyn BuildTarget) {
        target.set_property(IPO, vec!["off".to_string()]);
        tracing::debug!(
            "recorded IPO opt-out for `{}`",
            target.container_name()
        );
    }
}
