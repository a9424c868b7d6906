//! Core data structures for Bulwark.
//!
//! This module contains the build-description side of the engine:
//! targets with named property lists, the scope-wide property bag,
//! and the `Bulwark.toml` manifest the CLI reads them from.

pub mod manifest;
pub mod target;

pub use manifest::{Manifest, ManifestError, TargetSpec, MANIFEST_NAME};
pub use target::{
    BuildScope, BuildTarget, PropertyContainer, PropertyTarget, TargetKind, COMPILE_DEFINITIONS,
    COMPILE_OPTIONS, IPO, LINK_OPTIONS,
};
