//! `bulwark harden` command

use anyhow::Result;

use crate::cli::HardenArgs;
use bulwark::ops::{self, HardenOptions};
use bulwark::util::GlobalContext;

pub fn execute(args: HardenArgs) -> Result<()> {
    let gctx = GlobalContext::new()?;

    let opts = HardenOptions {
        full: args.full,
        targets: args.target,
        no_cache: args.no_cache,
        emit: args.emit,
    };

    ops::harden(&gctx, &opts)
}
