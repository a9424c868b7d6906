//! Flag composition - from rule tables to applicable flag lists.
//!
//! Composition is a two-stage filter: predicates drop rules that do not
//! apply to the environment, then the probe cache drops candidates the
//! toolchain rejects. Declaration order is preserved throughout; some
//! flags are order-sensitive on the final command line even though the
//! engine treats them as a capability set.

use std::collections::HashSet;

use super::cache::ProbeCache;
use super::probe::{CapabilityProbe, FlagCategory};
use super::rules::{rules_for, RuleContext, RuleGroup};

/// A flag that survived composition, tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedFlag {
    /// Literal flag text
    pub flag: &'static str,

    /// Property category the flag belongs to
    pub category: FlagCategory,
}

/// A composed group's output, split by destination property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedSet {
    /// Flags destined for the compile-options property
    pub compile: Vec<String>,

    /// Flags destined for the link-options property
    pub link: Vec<String>,

    /// Definitions destined for the compile-definitions property
    pub definitions: Vec<String>,
}

impl ComposedSet {
    /// Whether composition produced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.compile.is_empty() && self.link.is_empty() && self.definitions.is_empty()
    }

    /// Total number of composed flags.
    pub fn len(&self) -> usize {
        self.compile.len() + self.link.len() + self.definitions.len()
    }
}

impl FromIterator<ComposedFlag> for ComposedSet {
    fn from_iter<T: IntoIterator<Item = ComposedFlag>>(iter: T) -> Self {
        let mut set = ComposedSet::default();
        for item in iter {
            match item.category {
                FlagCategory::CompileOption => set.compile.push(item.flag.to_string()),
                FlagCategory::LinkOption => set.link.push(item.flag.to_string()),
                FlagCategory::CompileDefinition => set.definitions.push(item.flag.to_string()),
            }
        }
        set
    }
}

/// Compose one rule group against the current environment.
///
/// Candidates whose predicate is false are dropped without probing;
/// surviving probed candidates go through the cache. An empty result is
/// normal (unsupported vendors fall through silently here; the entry
/// points decide whether to warn).
pub fn compose(
    group: RuleGroup,
    ctx: &RuleContext,
    cache: &ProbeCache,
    probe: &dyn CapabilityProbe,
) -> Vec<ComposedFlag> {
    let mut seen: HashSet<(&str, FlagCategory)> = HashSet::new();
    let mut out = Vec::new();

    for rule in rules_for(group) {
        if !(rule.applies)(ctx) {
            continue;
        }
        if !seen.insert((rule.flag, rule.category)) {
            continue;
        }
        if rule.probed && !cache.get_or_compute(rule.flag, rule.category, probe) {
            tracing::debug!("flag `{}` rejected by toolchain, dropped from {}", rule.flag, group);
            continue;
        }
        out.push(ComposedFlag {
            flag: rule.flag,
            category: rule.category,
        });
    }

    out
}

/// Compose a group and split the survivors by destination property.
pub fn compose_set(
    group: RuleGroup,
    ctx: &RuleContext,
    cache: &ProbeCache,
    probe: &dyn CapabilityProbe,
) -> ComposedSet {
    compose(group, ctx, cache, probe).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::super::probe::testing::FakeProbe;
    use super::super::rules::Modes;
    use super::*;
    use crate::core::target::TargetKind;
    use crate::toolchain::{ArchFamily, TargetOs, ToolchainDescriptor, ToolchainVendor};
    use semver::Version;

    fn gcc_linux() -> ToolchainDescriptor {
        ToolchainDescriptor::new(
            ToolchainVendor::Gcc,
            Version::new(13, 0, 0),
            TargetOs::Linux,
            ArchFamily::X86_64,
            64,
            "gcc",
        )
    }

    #[test]
    fn test_compose_preserves_declaration_order() {
        let tc = gcc_linux();
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        let cache = ProbeCache::new();
        let probe = FakeProbe::accept_all();

        let set = compose_set(RuleGroup::Warnings, &ctx, &cache, &probe);
        assert_eq!(
            set.compile,
            vec!["-Wall", "-Wextra", "-Wformat=2", "-Wimplicit-fallthrough"]
        );
    }

    #[test]
    fn test_compose_drops_rejected_candidates() {
        let tc = gcc_linux();
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        let cache = ProbeCache::new();
        // An older toolchain without stack-clash support.
        let probe = FakeProbe::accepting(["-fstack-protector-strong"]);

        let set = compose_set(RuleGroup::StackProtection, &ctx, &cache, &probe);
        assert_eq!(set.compile, vec!["-fstack-protector-strong"]);
    }

    #[test]
    fn test_compose_empty_group_is_not_an_error() {
        let msvc = ToolchainDescriptor::new(
            ToolchainVendor::Msvc,
            Version::new(19, 0, 0),
            TargetOs::Windows,
            ArchFamily::X86_64,
            64,
            "cl",
        );
        let ctx = RuleContext::for_target(&msvc, Modes::default(), TargetKind::Exe);
        let cache = ProbeCache::new();
        let probe = FakeProbe::accept_all();

        let set = compose_set(RuleGroup::Warnings, &ctx, &cache, &probe);
        assert!(set.is_empty());
        // Nothing was probed for a group with no applicable predicates.
        assert_eq!(probe.call_count(), 0);
    }

    #[test]
    fn test_compose_reuses_cache_across_calls() {
        let tc = gcc_linux();
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        let cache = ProbeCache::new();
        let probe = FakeProbe::accept_all();

        let first = compose_set(RuleGroup::Warnings, &ctx, &cache, &probe);
        let probes_after_first = probe.call_count();
        let second = compose_set(RuleGroup::Warnings, &ctx, &cache, &probe);

        assert_eq!(first, second);
        assert_eq!(probe.call_count(), probes_after_first);
    }

    #[test]
    fn test_definitions_not_probed() {
        let tc = gcc_linux();
        let ctx = RuleContext::for_target(&tc, Modes::default(), TargetKind::Exe);
        let cache = ProbeCache::new();
        let probe = FakeProbe::reject_all();

        // Even a probe rejecting everything leaves definitions intact.
        let set = compose_set(RuleGroup::HardeningDefinitions, &ctx, &cache, &probe);
        assert_eq!(set.definitions, vec!["_FORTIFY_SOURCE=3", "_GLIBCXX_ASSERTIONS"]);
        assert_eq!(probe.call_count(), 0);
    }

    #[test]
    fn test_lto_set_spans_both_categories() {
        let tc = gcc_linux();
        let ctx = RuleContext::for_scope(&tc, Modes::default());
        let cache = ProbeCache::new();
        let probe = FakeProbe::accept_all();

        let set = compose_set(RuleGroup::Lto, &ctx, &cache, &probe);
        assert_eq!(set.compile, vec!["-flto", "-ffat-lto-objects"]);
        assert_eq!(set.link, vec!["-flto"]);
    }
}
