//! Build-target abstraction - what gets configured.
//!
//! The engine never builds anything; it only reads and appends named
//! property lists on targets supplied by the surrounding build
//! description. A target exposes get/set-property-by-name plus a kind
//! tag (executable vs library), which is all the rule predicates need.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Property holding compiler invocation flags.
pub const COMPILE_OPTIONS: &str = "compile-options";

/// Property holding linker invocation flags.
pub const LINK_OPTIONS: &str = "link-options";

/// Property holding preprocessor definitions (`NAME` or `NAME=VALUE`).
pub const COMPILE_DEFINITIONS: &str = "compile-definitions";

/// Property holding the per-target IPO override marker (`on` / `off`).
pub const IPO: &str = "ipo";

/// The kind of target being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Executable binary
    #[serde(alias = "bin")]
    Exe,

    /// Static library (.a / .lib)
    #[serde(alias = "lib", alias = "static")]
    StaticLib,

    /// Shared/dynamic library (.so / .dylib / .dll)
    #[serde(alias = "dylib", alias = "dynamic")]
    SharedLib,
}

impl Default for TargetKind {
    fn default() -> Self {
        TargetKind::Exe
    }
}

impl TargetKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Exe => "exe",
            TargetKind::StaticLib => "staticlib",
            TargetKind::SharedLib => "sharedlib",
        }
    }

    /// Check if this is a library (static or shared).
    pub fn is_library(&self) -> bool {
        matches!(self, TargetKind::StaticLib | TargetKind::SharedLib)
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything carrying named, append-only flag lists.
///
/// Both per-target configuration and scope-wide configuration go through
/// this interface; the applier is the only mutator.
pub trait PropertyContainer {
    /// Stable name identifying this container within a run.
    fn container_name(&self) -> &str;

    /// Read a property. Absent properties are `None`, which callers
    /// treat as an empty list, never as an error.
    fn get_property(&self, property: &str) -> Option<Vec<String>>;

    /// Replace a property's value wholesale.
    fn set_property(&mut self, property: &str, values: Vec<String>);
}

/// A configurable build target.
pub trait BuildTarget: PropertyContainer {
    /// The kind of artifact this target produces.
    fn kind(&self) -> TargetKind;
}

/// A concrete target backed by an in-memory property map.
///
/// This is what the CLI constructs from `Bulwark.toml`; an embedding
/// build system would supply its own [`BuildTarget`] implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyTarget {
    /// Target name
    pub name: String,

    /// What kind of artifact the target produces
    #[serde(default)]
    pub kind: TargetKind,

    /// Named property lists
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl PropertyTarget {
    /// Create a new target with the given name and kind.
    pub fn new(name: impl Into<String>, kind: TargetKind) -> Self {
        PropertyTarget {
            name: name.into(),
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Create a new executable target.
    pub fn exe(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::Exe)
    }

    /// Create a new static library target.
    pub fn staticlib(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::StaticLib)
    }

    /// Create a new shared library target.
    pub fn sharedlib(name: impl Into<String>) -> Self {
        Self::new(name, TargetKind::SharedLib)
    }

    /// Seed a property with pre-existing flags.
    pub fn with_property(mut self, property: &str, values: Vec<String>) -> Self {
        self.properties.insert(property.to_string(), values);
        self
    }
}

impl PropertyContainer for PropertyTarget {
    fn container_name(&self) -> &str {
        &self.name
    }

    fn get_property(&self, property: &str) -> Option<Vec<String>> {
        self.properties.get(property).cloned()
    }

    fn set_property(&mut self, property: &str, values: Vec<String>) {
        self.properties.insert(property.to_string(), values);
    }
}

impl BuildTarget for PropertyTarget {
    fn kind(&self) -> TargetKind {
        self.kind
    }
}

/// Scope-wide configuration surface.
///
/// Whole-program optimization applies at the build-scope level rather
/// than per target; the scope carries the same kind of property lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildScope {
    /// Named property lists applying to every target in the scope
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<String>>,
}

impl BuildScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        BuildScope::default()
    }
}

impl PropertyContainer for BuildScope {
    fn container_name(&self) -> &str {
        "<scope>"
    }

    fn get_property(&self, property: &str) -> Option<Vec<String>> {
        self.properties.get(property).cloned()
    }

    fn set_property(&mut self, property: &str, values: Vec<String>) {
        self.properties.insert(property.to_string(), values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_kind() {
        assert!(!TargetKind::Exe.is_library());
        assert!(TargetKind::StaticLib.is_library());
        assert!(TargetKind::SharedLib.is_library());
        assert_eq!(TargetKind::SharedLib.to_string(), "sharedlib");
    }

    #[test]
    fn test_target_kind_aliases() {
        let kind: TargetKind = serde_json::from_str("\"bin\"").unwrap();
        assert_eq!(kind, TargetKind::Exe);
        let kind: TargetKind = serde_json::from_str("\"dylib\"").unwrap();
        assert_eq!(kind, TargetKind::SharedLib);
    }

    #[test]
    fn test_property_roundtrip() {
        let mut target = PropertyTarget::exe("app");
        assert_eq!(target.get_property(COMPILE_OPTIONS), None);

        target.set_property(COMPILE_OPTIONS, vec!["-O2".to_string()]);
        assert_eq!(
            target.get_property(COMPILE_OPTIONS),
            Some(vec!["-O2".to_string()])
        );
    }

    #[test]
    fn test_scope_properties() {
        let mut scope = BuildScope::new();
        scope.set_property(LINK_OPTIONS, vec!["-flto".to_string()]);
        assert_eq!(
            scope.get_property(LINK_OPTIONS),
            Some(vec!["-flto".to_string()])
        );
        assert_eq!(scope.container_name(), "<scope>");
    }
}
