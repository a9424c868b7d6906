//! Probe-result caching.
//!
//! Probe results depend only on the toolchain, so the cache is shared
//! across targets and, when persisted, across configuration runs. Keys
//! are derived from `(category, flag)` with an injective escaping scheme:
//! two distinct flags can never collide, because every byte outside
//! `[A-Za-z0-9]` is hex-escaped rather than stripped.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::probe::{CapabilityProbe, FlagCategory};

/// Whether lookups consult stored results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Store and reuse probe results
    #[default]
    Normal,
    /// Force a fresh probe on every call (results are still recorded)
    Bypass,
}

/// Run-scoped (optionally persisted) store of probe results.
///
/// Injected explicitly everywhere it is used; never a hidden singleton,
/// so each test can construct a fresh one.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: Mutex<HashMap<String, bool>>,
    mode: CacheMode,
}

/// On-disk representation of a persisted cache.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    /// Fingerprint of the toolchain the entries were probed against
    toolchain: String,
    /// Probe results keyed by normalized identifier
    entries: BTreeMap<String, bool>,
}

impl ProbeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ProbeCache::default()
    }

    /// Create a cache in bypass mode: every lookup re-probes.
    pub fn bypass() -> Self {
        ProbeCache {
            entries: Mutex::new(HashMap::new()),
            mode: CacheMode::Bypass,
        }
    }

    /// Normalized cache key for a `(category, flag)` pair.
    ///
    /// Alphanumeric bytes pass through; everything else becomes `_XX`
    /// (two hex digits). The mapping is injective, so `-O2` and `_O2`
    /// get distinct keys.
    pub fn cache_key(flag: &str, category: FlagCategory) -> String {
        let mut key = String::with_capacity(category.as_str().len() + 1 + flag.len());
        key.push_str(category.as_str());
        key.push(':');
        for byte in flag.bytes() {
            if byte.is_ascii_alphanumeric() {
                key.push(byte as char);
            } else {
                key.push('_');
                key.push_str(&format!("{:02x}", byte));
            }
        }
        key
    }

    /// Look up a stored result without probing.
    pub fn lookup(&self, flag: &str, category: FlagCategory) -> Option<bool> {
        if self.mode == CacheMode::Bypass {
            return None;
        }
        let entries = self.entries.lock().expect("probe cache poisoned");
        entries.get(&Self::cache_key(flag, category)).copied()
    }

    /// Return the cached result or run the probe and store it.
    ///
    /// Concurrent probes of the same key are harmless: results are
    /// deterministic and in `Normal` mode the first stored value wins.
    /// Bypass mode always returns the fresh verdict and overwrites the
    /// stored one.
    pub fn get_or_compute(
        &self,
        flag: &str,
        category: FlagCategory,
        probe: &dyn CapabilityProbe,
    ) -> bool {
        let key = Self::cache_key(flag, category);

        if self.mode == CacheMode::Normal {
            let entries = self.entries.lock().expect("probe cache poisoned");
            if let Some(&accepted) = entries.get(&key) {
                return accepted;
            }
        }

        // Probe outside the lock; a trial compilation can be slow.
        let accepted = probe.probe(flag, category);

        let mut entries = self.entries.lock().expect("probe cache poisoned");
        match self.mode {
            CacheMode::Normal => *entries.entry(key).or_insert(accepted),
            CacheMode::Bypass => {
                entries.insert(key, accepted);
                accepted
            }
        }
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("probe cache poisoned").len()
    }

    /// Whether the cache holds no results.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored entries in key order (for display).
    pub fn entries(&self) -> BTreeMap<String, bool> {
        self.entries
            .lock()
            .expect("probe cache poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Load a persisted cache, discarding it when the toolchain
    /// fingerprint no longer matches. Absent or unreadable files yield
    /// an empty cache.
    pub fn load(path: &Path, toolchain_fingerprint: &str) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return ProbeCache::new();
        };

        let file: CacheFile = match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("discarding unreadable probe cache {}: {}", path.display(), e);
                return ProbeCache::new();
            }
        };

        if file.toolchain != toolchain_fingerprint {
            tracing::debug!(
                "probe cache {} was recorded for a different toolchain; discarding",
                path.display()
            );
            return ProbeCache::new();
        }

        ProbeCache {
            entries: Mutex::new(file.entries.into_iter().collect()),
            mode: CacheMode::Normal,
        }
    }

    /// Persist the cache for the given toolchain fingerprint.
    pub fn save(&self, path: &Path, toolchain_fingerprint: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create cache directory: {}", parent.display())
            })?;
        }

        let file = CacheFile {
            toolchain: toolchain_fingerprint.to_string(),
            entries: self.entries(),
        };

        let contents = serde_json::to_string_pretty(&file)
            .context("failed to serialize probe cache")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write probe cache: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::probe::testing::FakeProbe;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_injective_escaping() {
        // Distinct flags must never share a key, even when they differ
        // only in a character the escaping touches.
        let a = ProbeCache::cache_key("-O2", FlagCategory::CompileOption);
        let b = ProbeCache::cache_key("_O2", FlagCategory::CompileOption);
        let c = ProbeCache::cache_key("-O_2", FlagCategory::CompileOption);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);

        assert_eq!(a, "compile:_2dO2");
    }

    #[test]
    fn test_cache_key_category_scoped() {
        // The same flag can be valid as a compile option and invalid as
        // a link option, so the keys must differ.
        let compile = ProbeCache::cache_key("-flto", FlagCategory::CompileOption);
        let link = ProbeCache::cache_key("-flto", FlagCategory::LinkOption);
        assert_ne!(compile, link);
    }

    #[test]
    fn test_get_or_compute_probes_once() {
        let cache = ProbeCache::new();
        let probe = FakeProbe::accepting(["-Wall"]);

        assert!(cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        assert!(cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        assert_eq!(probe.call_count(), 1);

        assert!(!cache.get_or_compute("-Wnope", FlagCategory::CompileOption, &probe));
        assert_eq!(probe.call_count(), 2);
    }

    #[test]
    fn test_bypass_mode_reprobes() {
        let cache = ProbeCache::bypass();
        let probe = FakeProbe::accepting(["-Wall"]);

        assert!(cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        assert!(cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        assert_eq!(probe.call_count(), 2);
    }

    /// Probe whose verdict changes between calls, as after an in-process
    /// toolchain change.
    struct FlipProbe {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl CapabilityProbe for FlipProbe {
        fn probe(&self, _flag: &str, _category: FlagCategory) -> bool {
            // Accepts on the first call only.
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                == 0
        }
    }

    #[test]
    fn test_bypass_mode_returns_fresh_verdict() {
        let cache = ProbeCache::bypass();
        let probe = FlipProbe {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };

        assert!(cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        // The re-probe's verdict wins over the stored one.
        assert!(!cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe));
        assert_eq!(
            cache.entries().get("compile:_2dWall").copied(),
            Some(false)
        );
    }

    #[test]
    fn test_persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("probes.json");

        let cache = ProbeCache::new();
        let probe = FakeProbe::accepting(["-Wall"]);
        cache.get_or_compute("-Wall", FlagCategory::CompileOption, &probe);
        cache.get_or_compute("-Wbad", FlagCategory::CompileOption, &probe);
        cache.save(&path, "fp-1").unwrap();

        // Matching fingerprint: results come back without probing.
        let reloaded = ProbeCache::load(&path, "fp-1");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.lookup("-Wall", FlagCategory::CompileOption),
            Some(true)
        );
        assert_eq!(
            reloaded.lookup("-Wbad", FlagCategory::CompileOption),
            Some(false)
        );

        // Toolchain change invalidates everything.
        let invalidated = ProbeCache::load(&path, "fp-2");
        assert!(invalidated.is_empty());
    }

    #[test]
    fn test_load_missing_or_corrupt() {
        let tmp = TempDir::new().unwrap();
        assert!(ProbeCache::load(&tmp.path().join("absent.json"), "fp").is_empty());

        let corrupt = tmp.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(ProbeCache::load(&corrupt, "fp").is_empty());
    }
}
