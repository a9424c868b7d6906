//! `bulwark toolchain` command

use anyhow::Result;

use bulwark::ops::load_session_config;
use bulwark::toolchain::detect_toolchain;
use bulwark::util::GlobalContext;

pub fn execute() -> Result<()> {
    let gctx = GlobalContext::new()?;
    let config = load_session_config(&gctx);
    let toolchain = detect_toolchain(&config)?;

    println!("Toolchain:");
    println!();
    println!("  CC:          {}", toolchain.compiler_path().display());
    println!("  Vendor:      {}", toolchain.vendor);
    println!("  Version:     {}", toolchain.version);
    println!(
        "  Target:      {} {} ({}-bit)",
        toolchain.os, toolchain.arch, toolchain.pointer_width
    );
    println!("  Fingerprint: {}", toolchain.fingerprint());

    if !toolchain.is_supported() {
        println!();
        println!("  note: no rule groups apply to this vendor");
    }

    Ok(())
}
