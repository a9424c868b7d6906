//! Command implementations.

pub mod cache;
pub mod completions;
pub mod harden;
pub mod ipo;
pub mod probe;
pub mod toolchain;
