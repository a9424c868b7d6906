//! Implementation of `bulwark probe`.

use anyhow::Result;

use crate::engine::FlagCategory;
use crate::util::GlobalContext;

use super::{load_session_config, start_session};

/// Options for the probe command.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// The flag to probe
    pub flag: String,

    /// Probe with a trial link instead of a compile-only trial
    pub link: bool,

    /// Force a fresh probe, bypassing the persistent cache
    pub no_cache: bool,
}

/// Probe one flag against the detected toolchain.
///
/// Returns the verdict; rejection is an outcome, not an error.
pub fn probe_flag(gctx: &GlobalContext, opts: &ProbeOptions) -> Result<bool> {
    let mut config = load_session_config(gctx);
    config.probe.no_cache |= opts.no_cache;

    let session = start_session(gctx, config)?;

    let category = if opts.link {
        FlagCategory::LinkOption
    } else {
        FlagCategory::CompileOption
    };
    let accepted = session.engine.check_flag(&opts.flag, category);

    session.persist_cache(gctx)?;
    Ok(accepted)
}
