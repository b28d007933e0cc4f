//! Mod manifests (`mod.json`) and the resolved descriptor.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the manifest file inside each mod directory.
pub const MANIFEST_FILE: &str = "mod.json";

/// `mod.json` as written by mod authors.
///
/// ```json
/// {
///   "name": "better-traders",
///   "version": "1.2.0",
///   "author": "someone",
///   "main": "better_traders",
///   "dependencies": ["core-tweaks"],
///   "isBundleMod": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModManifest {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    /// Entry point in the server's [`ModCatalog`](crate::ModCatalog).
    pub main: String,
    /// Mods that must be installed and load first.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Mods that, when installed, must load after this one.
    #[serde(default)]
    pub load_before: Vec<String>,
    /// Mods that, when installed, must load before this one.
    #[serde(default)]
    pub load_after: Vec<String>,
    /// Mods that must not be installed alongside this one.
    #[serde(default)]
    pub incompatibilities: Vec<String>,
    /// Whether the mod ships asset bundles (`bundles.json`).
    #[serde(default)]
    pub is_bundle_mod: bool,
}

impl ModManifest {
    /// A manifest with just a name and an entry point.
    pub fn new(name: impl Into<String>, main: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            author: String::new(),
            main: main.into(),
            dependencies: Vec::new(),
            load_before: Vec::new(),
            load_after: Vec::new(),
            incompatibilities: Vec::new(),
            is_bundle_mod: false,
        }
    }

    /// Adds a hard dependency.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// A discovered mod: its manifest plus where it was found and its rank
/// in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDescriptor {
    pub manifest: ModManifest,
    /// The mod's directory.
    pub path: PathBuf,
    /// Position in discovery order. Breaks ties between mods that are
    /// otherwise free to load in any order.
    pub load_order_rank: usize,
}

impl ModDescriptor {
    pub fn new(manifest: ModManifest, path: impl Into<PathBuf>, load_order_rank: usize) -> Self {
        Self {
            manifest,
            path: path.into(),
            load_order_rank,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn main(&self) -> &str {
        &self.manifest.main
    }

    pub fn is_bundle_mod(&self) -> bool {
        self.manifest.is_bundle_mod
    }
}

/// `order.json`: mods listed here are ranked first, in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOrderFile {
    #[serde(default)]
    pub order: Vec<String>,
}
