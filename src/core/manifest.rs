//! Build-description manifest (`Bulwark.toml`).
//!
//! The manifest declares the targets the CLI configures. It is a thin
//! description, not a build system: target names, kinds, and any flags
//! already attached by the outer build.
//!
//! ```toml
//! [[target]]
//! name = "server"
//! kind = "exe"
//! compile-options = ["-O2"]
//!
//! [[target]]
//! name = "proto"
//! kind = "sharedlib"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::target::{PropertyTarget, TargetKind, COMPILE_DEFINITIONS, COMPILE_OPTIONS, LINK_OPTIONS};

/// The manifest file name.
pub const MANIFEST_NAME: &str = "Bulwark.toml";

/// Errors loading the build description.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no {MANIFEST_NAME} found in `{dir}` or any parent directory\nhelp: create one declaring the targets to configure")]
    NotFound { dir: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("duplicate target name `{name}` in {path}")]
    DuplicateTarget { name: String, path: PathBuf },
}

/// A target declaration as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetSpec {
    /// Target name
    pub name: String,

    /// Artifact kind
    #[serde(default)]
    pub kind: TargetKind,

    /// Compiler flags already attached by the outer build
    #[serde(default)]
    pub compile_options: Vec<String>,

    /// Linker flags already attached by the outer build
    #[serde(default)]
    pub link_options: Vec<String>,

    /// Preprocessor definitions already attached by the outer build
    #[serde(default)]
    pub compile_definitions: Vec<String>,
}

impl TargetSpec {
    /// Materialize the declaration into a configurable target.
    pub fn to_target(&self) -> PropertyTarget {
        let mut target = PropertyTarget::new(&self.name, self.kind);
        if !self.compile_options.is_empty() {
            target.properties.insert(
                COMPILE_OPTIONS.to_string(),
                self.compile_options.clone(),
            );
        }
        if !self.link_options.is_empty() {
            target
                .properties
                .insert(LINK_OPTIONS.to_string(), self.link_options.clone());
        }
        if !self.compile_definitions.is_empty() {
            target.properties.insert(
                COMPILE_DEFINITIONS.to_string(),
                self.compile_definitions.clone(),
            );
        }
        target
    }
}

/// The parsed build description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared targets
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetSpec>,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest: Manifest =
            toml::from_str(&contents).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut seen = std::collections::HashSet::new();
        for target in &manifest.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(ManifestError::DuplicateTarget {
                    name: target.name.clone(),
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(manifest)
    }

    /// Find a declared target by name.
    pub fn target(&self, name: &str) -> Option<&TargetSpec> {
        self.targets.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(contents: &str) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&path, contents).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_load_manifest() {
        let (_tmp, path) = write_manifest(
            r#"
            [[target]]
            name = "server"
            kind = "exe"
            compile-options = ["-O2", "-g"]

            [[target]]
            name = "proto"
            kind = "sharedlib"
            "#,
        );

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.targets.len(), 2);

        let server = manifest.target("server").unwrap();
        assert_eq!(server.kind, TargetKind::Exe);
        assert_eq!(server.compile_options, vec!["-O2", "-g"]);

        assert_eq!(manifest.target("proto").unwrap().kind, TargetKind::SharedLib);
        assert!(manifest.target("missing").is_none());
    }

    #[test]
    fn test_to_target_seeds_properties() {
        let spec = TargetSpec {
            name: "app".to_string(),
            kind: TargetKind::Exe,
            compile_options: vec!["-O2".to_string()],
            link_options: vec![],
            compile_definitions: vec!["NDEBUG".to_string()],
        };

        let target = spec.to_target();
        assert_eq!(
            target.properties.get(COMPILE_OPTIONS),
            Some(&vec!["-O2".to_string()])
        );
        assert!(!target.properties.contains_key(LINK_OPTIONS));
        assert_eq!(
            target.properties.get(COMPILE_DEFINITIONS),
            Some(&vec!["NDEBUG".to_string()])
        );
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let (_tmp, path) = write_manifest(
            r#"
            [[target]]
            name = "app"

            [[target]]
            name = "app"
            "#,
        );

        assert!(matches!(
            Manifest::load(&path),
            Err(ManifestError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        let (_tmp, path) = write_manifest("not toml at all [[[");
        assert!(matches!(
            Manifest::load(&path),
            Err(ManifestError::Parse { .. })
        ));
    }
}
