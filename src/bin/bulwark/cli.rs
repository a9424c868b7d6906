//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Bulwark - hardening and whole-program-optimization flags for C/C++ builds
#[derive(Parser)]
#[command(name = "bulwark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose and apply hardening flags to the declared targets
    Harden(HardenArgs),

    /// Enable whole-program optimization for the scope or one target
    Ipo(IpoArgs),

    /// Probe a single flag against the detected toolchain
    Probe(ProbeArgs),

    /// Show the detected toolchain
    Toolchain,

    /// Manage the probe-result cache
    Cache(CacheArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct HardenArgs {
    /// Enable the full hardening extension
    #[arg(long)]
    pub full: bool,

    /// Specific targets to harden (defaults to all declared targets)
    #[arg(long)]
    pub target: Vec<String>,

    /// Bypass the probe cache
    #[arg(long)]
    pub no_cache: bool,

    /// Write resulting target properties as TOML
    #[arg(long, value_name = "PATH")]
    pub emit: Option<PathBuf>,
}

#[derive(Args)]
pub struct IpoArgs {
    /// Prefer ThinLTO where the toolchain supports it
    #[arg(long)]
    pub thin: bool,

    /// Apply to one declared target instead of the whole scope
    #[arg(long)]
    pub target: Option<String>,

    /// Record an IPO opt-out for the named target
    #[arg(long, requires = "target")]
    pub disable: bool,

    /// Bypass the probe cache
    #[arg(long)]
    pub no_cache: bool,

    /// Write resulting properties as TOML
    #[arg(long, value_name = "PATH")]
    pub emit: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProbeArgs {
    /// Flag to probe (e.g. -fstack-protector-strong)
    #[arg(allow_hyphen_values = true)]
    pub flag: String,

    /// Probe with a trial link instead of a compile-only trial
    #[arg(long)]
    pub link: bool,

    /// Bypass the probe cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print the cache file path
    Path,

    /// List cached probe results
    List,

    /// Delete the cache file
    Clean,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
