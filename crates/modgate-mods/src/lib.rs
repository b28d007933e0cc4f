//! # modgate-mods
//!
//! Third-party mods extend the server without touching the core: they
//! register routes, serializers, item-event action groups and update
//! hooks from lifecycle hooks the loader calls while the server boots.
//!
//! # Key types
//!
//! - [`ModLoader`]: discovery, ordering, instantiation, phase runs
//! - [`ServerMod`]: the lifecycle hooks a mod implements
//! - [`ModCatalog`]: entry points compiled into the server
//! - [`ModRegistrar`]: what a hook may register
//! - [`ServiceScope`]: per-mod and shared service maps
//! - [`BundleRegistry`]: asset bundles of bundle mods

mod bundle;
mod discovery;
mod error;
mod loader;
mod manifest;
mod order;
mod registrar;
mod scope;
mod server_mod;

pub use bundle::{
    BUNDLE_DIR, BUNDLE_MANIFEST_FILE, BundleInfo, BundleManifest, BundleManifestEntry,
    BundleRegistry,
};
pub use discovery::{apply_order, discover_mods};
pub use error::{BoxError, LoaderError};
pub use loader::{HookFailure, LoadPhase, LoaderConfig, ModLoader, PhaseReport};
pub use manifest::{LoadOrderFile, MANIFEST_FILE, ModDescriptor, ModManifest};
pub use order::resolve_load_order;
pub use registrar::{LoadRegistries, ModRegistrar};
pub use scope::ServiceScope;
pub use server_mod::{ModCatalog, ServerMod};
