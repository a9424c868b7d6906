//! Implementation of `bulwark harden`.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::{Manifest, PropertyTarget};
use crate::util::GlobalContext;

use super::{emit_targets, load_session_config, start_session};

/// Options for the harden command.
#[derive(Debug, Clone, Default)]
pub struct HardenOptions {
    /// Enable the full hardening extension
    pub full: bool,

    /// Specific targets to harden (empty = all declared targets)
    pub targets: Vec<String>,

    /// Force fresh probes, bypassing the persistent cache
    pub no_cache: bool,

    /// Write resulting target properties as TOML
    pub emit: Option<PathBuf>,
}

/// Harden the targets declared in `Bulwark.toml`.
pub fn harden(gctx: &GlobalContext, opts: &HardenOptions) -> Result<()> {
    let manifest_path = gctx.find_manifest()?;
    let manifest = Manifest::load(&manifest_path)?;
    if manifest.targets.is_empty() {
        bail!("{} declares no targets", manifest_path.display());
    }
    validate_target_filter(&manifest, &opts.targets)?;

    let mut config = load_session_config(gctx);
    config.hardening.full |= opts.full;
    config.probe.no_cache |= opts.no_cache;

    let mut session = start_session(gctx, config)?;
    println!("Toolchain: {}", session.engine.toolchain());

    let mut configured: Vec<PropertyTarget> = Vec::new();
    for spec in &manifest.targets {
        if !opts.targets.is_empty() && !opts.targets.iter().any(|t| t == &spec.name) {
            continue;
        }

        let mut target = spec.to_target();
        let summary = session.engine.harden(&mut target);
        println!(
            "  {} ({}): +{} compile, +{} link, +{} definitions",
            target.name,
            target.kind,
            summary.compile_flags,
            summary.link_flags,
            summary.definitions
        );
        configured.push(target);
    }

    session.persist_cache(gctx)?;

    if let Some(path) = &opts.emit {
        emit_targets(path, &configured)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Reject requests naming targets the manifest does not declare.
///
/// This prevents silent no-ops when the user mistypes a target name.
fn validate_target_filter(manifest: &Manifest, targets: &[String]) -> Result<()> {
    for requested in targets {
        if manifest.target(requested).is_none() {
            let available: Vec<_> = manifest.targets.iter().map(|t| t.name.as_str()).collect();
            bail!(
                "unknown target `{}`\navailable targets: {}",
                requested,
                available.join(", ")
            );
        }
    }
    Ok(())
}
