//! `bulwark ipo` command

use anyhow::Result;

use crate::cli::IpoArgs;
use bulwark::ops::{self, IpoOptions};
use bulwark::util::GlobalContext;

pub fn execute(args: IpoArgs) -> Result<()> {
    let gctx = GlobalContext::new()?;

    let opts = IpoOptions {
        thin: args.thin,
        target: args.target,
        disable: args.disable,
        no_cache: args.no_cache,
        emit: args.emit,
    };

    ops::ipo(&gctx, &opts)
}
