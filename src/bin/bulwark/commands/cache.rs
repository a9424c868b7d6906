//! `bulwark cache` command
//!
//! Manage the persistent probe-result cache.

use anyhow::{Context, Result};

use crate::cli::{CacheArgs, CacheCommands};
use bulwark::util::GlobalContext;

pub fn execute(args: CacheArgs) -> Result<()> {
    match args.command {
        CacheCommands::Path => show_path(),
        CacheCommands::List => list_cache(),
        CacheCommands::Clean => clean_cache(),
    }
}

/// Print the cache file path.
fn show_path() -> Result<()> {
    let ctx = GlobalContext::new()?;
    println!("{}", ctx.probe_cache_path().display());
    Ok(())
}

/// List cached probe results.
fn list_cache() -> Result<()> {
    let ctx = GlobalContext::new()?;
    let path = ctx.probe_cache_path();

    if !path.exists() {
        println!("Probe cache is empty ({})", path.display());
        return Ok(());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    if let Some(fp) = file.get("toolchain").and_then(|v| v.as_str()) {
        println!("Toolchain fingerprint: {}", fp);
        println!();
    }

    match file.get("entries").and_then(|v| v.as_object()) {
        Some(entries) if !entries.is_empty() => {
            for (key, value) in entries {
                let verdict = if value.as_bool().unwrap_or(false) {
                    "accepted"
                } else {
                    "rejected"
                };
                println!("  {:<44} {}", key, verdict);
            }
            println!();
            println!("{} entries", entries.len());
        }
        _ => println!("(no entries)"),
    }

    Ok(())
}

/// Delete the cache file.
fn clean_cache() -> Result<()> {
    let ctx = GlobalContext::new()?;
    let path = ctx.probe_cache_path();

    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        println!("Removed {}", path.display());
    } else {
        println!("Probe cache is already empty");
    }

    Ok(())
}
