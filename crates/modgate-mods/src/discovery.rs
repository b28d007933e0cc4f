//! Finding installed mods on disk.
//!
//! ```text
//! user/mods/
//! ├── order.json            (optional)
//! ├── better-traders/
//! │   └── mod.json
//! └── hideout-plus/
//!     ├── mod.json
//!     └── bundles.json      (bundle mods only)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{LoadOrderFile, LoaderError, MANIFEST_FILE, ModDescriptor, ModManifest};

/// Reads every mod under `mods_dir`.
///
/// Directories are visited in name order. Mods named in `order_file`
/// (relative to `mods_dir`, optional) are ranked first, in the order the
/// file lists them; the rest keep directory order. A missing `mods_dir`
/// means no mods.
///
/// # Errors
///
/// Unreadable directories, malformed manifests and duplicate mod names
/// are fatal.
pub async fn discover_mods(
    mods_dir: &Path,
    order_file: &str,
) -> Result<Vec<ModDescriptor>, LoaderError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| LoaderError::Io { path, source }
    };

    if !tokio::fs::try_exists(mods_dir).await.map_err(io_err(mods_dir))? {
        warn!(path = %mods_dir.display(), "mods directory does not exist, loading no mods");
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    let mut entries = tokio::fs::read_dir(mods_dir).await.map_err(io_err(mods_dir))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err(mods_dir))? {
        let file_type = entry.file_type().await.map_err(io_err(&entry.path()))?;
        if file_type.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();

    let mut found: Vec<ModDescriptor> = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for dir in dirs {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path)
            .await
            .map_err(io_err(&manifest_path))?
        {
            warn!(path = %dir.display(), "directory has no {MANIFEST_FILE}, skipping");
            continue;
        }

        let manifest: ModManifest = read_json(&manifest_path).await?;
        if let Some(first) = seen.get(&manifest.name) {
            return Err(LoaderError::DuplicateMod {
                name: manifest.name,
                first: first.clone(),
                second: dir,
            });
        }
        seen.insert(manifest.name.clone(), dir.clone());

        debug!(mod_name = %manifest.name, version = %manifest.version, path = %dir.display(), "mod discovered");
        let rank = found.len();
        found.push(ModDescriptor::new(manifest, dir, rank));
    }

    let order_path = mods_dir.join(order_file);
    if tokio::fs::try_exists(&order_path).await.unwrap_or(false) {
        let order: LoadOrderFile = read_json(&order_path).await?;
        apply_order(&mut found, &order.order);
    }

    Ok(found)
}

/// Re-ranks `mods` so that names in `order` come first. Unknown names
/// are ignored with a warning.
pub fn apply_order(mods: &mut [ModDescriptor], order: &[String]) {
    for name in order {
        if !mods.iter().any(|m| m.name() == name) {
            warn!(mod_name = %name, "load order names a mod that is not installed");
        }
    }

    mods.sort_by_key(|m| {
        let listed = order.iter().position(|name| name == m.name());
        (listed.is_none(), listed.unwrap_or(0), m.load_order_rank)
    });
    for (rank, m) in mods.iter_mut().enumerate() {
        m.load_order_rank = rank;
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoaderError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| LoaderError::InvalidManifest {
        path: path.to_path_buf(),
        source,
    })
}
