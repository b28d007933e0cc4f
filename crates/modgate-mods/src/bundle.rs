//! Asset bundles shipped by bundle mods.
//!
//! A bundle mod carries `bundles.json` next to its manifest:
//!
//! ```json
//! { "manifest": [ { "key": "assets/content/items/rifle.bundle", "dependencyKeys": [] } ] }
//! ```
//!
//! Files live under `<mod dir>/bundles/<key>`. The registry is filled at
//! the start of the post-database-load phase and served by the bundle
//! routes the server installs when it seals.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::discovery::read_json;
use crate::{LoaderError, ModDescriptor};

/// Name of the bundle manifest inside a bundle mod's directory.
pub const BUNDLE_MANIFEST_FILE: &str = "bundles.json";

/// Sub-directory of a bundle mod holding the bundle files.
pub const BUNDLE_DIR: &str = "bundles";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub manifest: Vec<BundleManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifestEntry {
    pub key: String,
    #[serde(default)]
    pub dependency_keys: Vec<String>,
}

/// One servable bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    pub mod_name: String,
    pub key: String,
    /// Absolute location of the file on disk.
    #[serde(skip)]
    pub path: PathBuf,
    pub dependency_keys: Vec<String>,
}

/// Every bundle of every bundle mod, keyed by bundle key.
#[derive(Debug, Default)]
pub struct BundleRegistry {
    bundles: Vec<BundleInfo>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `bundles.json` of `descriptor` and registers its bundles.
    /// A later mod registering the same key replaces the earlier bundle.
    pub async fn load_mod_bundles(&mut self, descriptor: &ModDescriptor) -> Result<usize, LoaderError> {
        let manifest: BundleManifest =
            read_json(&descriptor.path.join(BUNDLE_MANIFEST_FILE)).await?;
        let count = manifest.manifest.len();

        for entry in manifest.manifest {
            let path = descriptor.path.join(BUNDLE_DIR).join(&entry.key);
            self.insert(BundleInfo {
                mod_name: descriptor.name().to_string(),
                key: entry.key,
                path,
                dependency_keys: entry.dependency_keys,
            });
        }

        debug!(mod_name = %descriptor.name(), bundles = count, "mod bundles registered");
        Ok(count)
    }

    /// Registers one bundle.
    pub fn insert(&mut self, bundle: BundleInfo) {
        match self.bundles.iter_mut().find(|b| b.key == bundle.key) {
            Some(slot) => *slot = bundle,
            None => self.bundles.push(bundle),
        }
    }

    /// Finds the bundle whose key `url` ends with.
    pub fn find_by_url(&self, url: &str) -> Option<&BundleInfo> {
        let path = url.split('?').next().unwrap_or_default();
        self.bundles.iter().find(|b| path.ends_with(b.key.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&BundleInfo> {
        self.bundles.iter().find(|b| b.key == key)
    }

    /// All bundles, in registration order.
    pub fn bundles(&self) -> &[BundleInfo] {
        &self.bundles
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(mod_name: &str, key: &str) -> BundleInfo {
        BundleInfo {
            mod_name: mod_name.to_string(),
            key: key.to_string(),
            path: PathBuf::from(key),
            dependency_keys: Vec::new(),
        }
    }

    #[test]
    fn test_insert_same_key_replaces() {
        let mut registry = BundleRegistry::new();
        registry.insert(bundle("a", "items/rifle.bundle"));
        registry.insert(bundle("b", "items/rifle.bundle"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("items/rifle.bundle").unwrap().mod_name, "b");
    }

    #[test]
    fn test_find_by_url_matches_key_suffix() {
        let mut registry = BundleRegistry::new();
        registry.insert(bundle("a", "items/rifle.bundle"));
        let found = registry.find_by_url("/files/bundle/items/rifle.bundle?v=2");
        assert_eq!(found.unwrap().key, "items/rifle.bundle");
        assert!(registry.find_by_url("/files/bundle/items/pistol.bundle").is_none());
    }
}
