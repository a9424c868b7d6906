//! Flag application - merging composed sets into target properties.
//!
//! The applier is the only thing that mutates property lists, and it is
//! strictly append-only: existing entries are never removed or
//! reordered. Idempotence is tracked per (container, property, group)
//! for the run rather than by string de-duplication, so a flag the
//! outer build already set by hand is left alone.

use std::collections::HashSet;

use crate::core::target::PropertyContainer;

use super::rules::RuleGroup;

/// Run-scoped applier tracking which groups already landed where.
#[derive(Debug, Default)]
pub struct Applier {
    applied: HashSet<(String, String, RuleGroup)>,
}

impl Applier {
    /// Create a fresh applier for a configuration run.
    pub fn new() -> Self {
        Applier::default()
    }

    /// Append `flags` to `property` on the container, once per group.
    ///
    /// Returns the number of flags appended (zero when the group was
    /// already applied to this container/property, or `flags` is empty).
    pub fn apply(
        &mut self,
        container: &mut dyn PropertyContainer,
        property: &str,
        group: RuleGroup,
        flags: &[String],
    ) -> usize {
        let key = (
            container.container_name().to_string(),
            property.to_string(),
            group,
        );
        if !self.applied.insert(key) {
            tracing::debug!(
                "group {} already applied to {}/{}, skipping",
                group,
                container.container_name(),
                property
            );
            return 0;
        }

        if flags.is_empty() {
            return 0;
        }

        let mut merged = container.get_property(property).unwrap_or_default();
        merged.extend(flags.iter().cloned());
        container.set_property(property, merged);
        flags.len()
    }

    /// Whether a group has already been applied to a container/property.
    pub fn was_applied(
        &self,
        container_name: &str,
        property: &str,
        group: RuleGroup,
    ) -> bool {
        self.applied.contains(&(
            container_name.to_string(),
            property.to_string(),
            group,
        ))
    }
}
