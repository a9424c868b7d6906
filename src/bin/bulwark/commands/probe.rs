//! `bulwark probe` command

use anyhow::Result;

use crate::cli::ProbeArgs;
use bulwark::ops::{self, ProbeOptions};
use bulwark::util::GlobalContext;

pub fn execute(args: ProbeArgs) -> Result<()> {
    let gctx = GlobalContext::new()?;

    let opts = ProbeOptions {
        flag: args.flag,
        link: args.link,
        no_cache: args.no_cache,
    };

    let accepted = ops::probe_flag(&gctx, &opts)?;
    println!(
        "{}: {}",
        opts.flag,
        if accepted { "accepted" } else { "rejected" }
    );

    Ok(())
}
