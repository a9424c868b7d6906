//! Bulwark - a hardening and whole-program-optimization flag engine
//! for C/C++ builds.
//!
//! This crate provides the core library functionality for Bulwark:
//! capability probing, probe-result caching, declarative flag rule
//! tables, and append-only application of composed flag sets to build
//! targets.

pub mod core;
pub mod engine;
pub mod ops;
pub mod toolchain;
pub mod util;

pub use self::core::{
    manifest::Manifest,
    target::{BuildScope, BuildTarget, PropertyContainer, PropertyTarget, TargetKind},
};

pub use engine::{Engine, Modes, ProbeCache};
pub use toolchain::{detect_toolchain, ToolchainDescriptor};
pub use util::context::GlobalContext;
