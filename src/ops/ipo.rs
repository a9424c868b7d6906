//! Implementation of `bulwark ipo`.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::{BuildScope, Manifest};
use crate::engine::IpoSummary;
use crate::util::GlobalContext;

use super::{emit_scope, emit_targets, load_session_config, start_session};

/// Options for the ipo command.
#[derive(Debug, Clone, Default)]
pub struct IpoOptions {
    /// Prefer ThinLTO where the toolchain supports it
    pub thin: bool,

    /// Apply to one declared target instead of the whole build scope
    pub target: Option<String>,

    /// Record an opt-out for the named target
    pub disable: bool,

    /// Force fresh probes, bypassing the persistent cache
    pub no_cache: bool,

    /// Write resulting properties as TOML
    pub emit: Option<PathBuf>,
}

/// Enable (or opt a target out of) whole-program optimization.
pub fn ipo(gctx: &GlobalContext, opts: &IpoOptions) -> Result<()> {
    if opts.disable && opts.target.is_none() {
        bail!("--disable requires --target; the scope defaults to IPO off");
    }

    let mut config = load_session_config(gctx);
    config.lto.thin |= opts.thin;
    config.probe.no_cache |= opts.no_cache;

    let mut session = start_session(gctx, config)?;
    println!("Toolchain: {}", session.engine.toolchain());

    match &opts.target {
        Some(name) => {
            let manifest = Manifest::load(&gctx.find_manifest()?)?;
            let Some(spec) = manifest.target(name) else {
                let available: Vec<_> =
                    manifest.targets.iter().map(|t| t.name.as_str()).collect();
                bail!(
                    "unknown target `{}`\navailable targets: {}",
                    name,
                    available.join(", ")
                );
            };

            let mut target = spec.to_target();
            if opts.disable {
                session.engine.disable_ipo_for_target(&mut target);
                println!("  {}: recorded IPO opt-out", target.name);
            } else {
                let summary = session.engine.enable_ipo_for_target(&mut target);
                report(&target.name, &summary);
            }

            session.persist_cache(gctx)?;
            if let Some(path) = &opts.emit {
                emit_targets(path, std::slice::from_ref(&target))?;
                println!("Wrote {}", path.display());
            }
        }
        None => {
            let mut scope = BuildScope::new();
            let summary = session.engine.enable_ipo(&mut scope);
            report("<scope>", &summary);

            session.persist_cache(gctx)?;
            if let Some(path) = &opts.emit {
                emit_scope(path, &scope)?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

fn report(name: &str, summary: &IpoSummary) {
    if summary.supported {
        println!(
            "  {}: +{} compile, +{} link",
            name, summary.compile_flags, summary.link_flags
        );
    } else {
        println!(
            "  {}: whole-program optimization unavailable, nothing applied",
            name
        );
    }
}
