//! The mod loader: discovery, ordering, instantiation and phase runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    LoadRegistries, LoaderError, ModCatalog, ModDescriptor, ModRegistrar, ServerMod, ServiceScope,
    discover_mods, resolve_load_order,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where mods are installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding one sub-directory per mod.
    pub mods_dir: PathBuf,
    /// Optional load-order file, relative to `mods_dir`.
    pub order_file: String,
    /// `false` loads no mods at all.
    pub enabled: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("user/mods"),
            order_file: "order.json".to_string(),
            enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// A lifecycle phase. Phases run in declaration order, once each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadPhase {
    PreLoad,
    PostDatabaseLoad,
    PostLoad,
}

impl LoadPhase {
    /// The phase that must run after `completed` (`None`: nothing ran yet).
    pub fn next_after(completed: Option<LoadPhase>) -> Option<LoadPhase> {
        match completed {
            None => Some(Self::PreLoad),
            Some(Self::PreLoad) => Some(Self::PostDatabaseLoad),
            Some(Self::PostDatabaseLoad) => Some(Self::PostLoad),
            Some(Self::PostLoad) => None,
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreLoad => "pre-load",
            Self::PostDatabaseLoad => "post-database-load",
            Self::PostLoad => "post-load",
        };
        f.write_str(name)
    }
}

/// An async hook that failed without stopping the phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub mod_name: String,
    pub message: String,
}

/// What one phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: LoadPhase,
    /// Mods whose hooks ran, in order.
    pub invoked: Vec<String>,
    /// Async hook failures, in order.
    pub failures: Vec<HookFailure>,
}

// ---------------------------------------------------------------------------
// ModLoader
// ---------------------------------------------------------------------------

struct LoadedMod {
    descriptor: ModDescriptor,
    instance: Box<dyn ServerMod>,
    scope: ServiceScope,
}

/// Loads mods and drives their lifecycle hooks.
///
/// ```text
/// prepare: discover ─▶ order ─▶ instantiate      (fatal errors only)
/// run_phase(PreLoad) ─▶ run_phase(PostDatabaseLoad) ─▶ run_phase(PostLoad)
/// ```
///
/// Everything fatal about the mod set (bad manifest, missing dependency,
/// cycle, unknown entry point) is reported by `prepare`, before any hook
/// has run.
pub struct ModLoader {
    mods: Vec<LoadedMod>,
    completed: Option<LoadPhase>,
}

impl ModLoader {
    /// Discovers, orders and instantiates the mods installed per `config`.
    pub async fn prepare(config: &LoaderConfig, catalog: &ModCatalog) -> Result<Self, LoaderError> {
        if !config.enabled {
            info!("mod loading disabled");
            return Ok(Self::empty());
        }
        let descriptors = discover_mods(&config.mods_dir, &config.order_file).await?;
        Self::from_descriptors(descriptors, catalog)
    }

    /// Orders and instantiates already discovered mods.
    pub fn from_descriptors(
        descriptors: Vec<ModDescriptor>,
        catalog: &ModCatalog,
    ) -> Result<Self, LoaderError> {
        let ordered = resolve_load_order(descriptors)?;

        // Check every entry point before creating any instance.
        if let Some(unknown) = ordered.iter().find(|d| !catalog.contains(d.main())) {
            return Err(LoaderError::UnknownEntryPoint {
                mod_name: unknown.name().to_string(),
                main: unknown.main().to_string(),
            });
        }

        let mut mods = Vec::with_capacity(ordered.len());
        for descriptor in ordered {
            let instance = catalog.instantiate(descriptor.main()).ok_or_else(|| {
                LoaderError::UnknownEntryPoint {
                    mod_name: descriptor.name().to_string(),
                    main: descriptor.main().to_string(),
                }
            })?;
            info!(
                mod_name = %descriptor.name(),
                version = %descriptor.manifest.version,
                author = %descriptor.manifest.author,
                "mod instantiated"
            );
            mods.push(LoadedMod {
                descriptor,
                instance,
                scope: ServiceScope::new(),
            });
        }

        Ok(Self {
            mods,
            completed: None,
        })
    }

    /// A loader with no mods.
    pub fn empty() -> Self {
        Self {
            mods: Vec::new(),
            completed: None,
        }
    }

    /// Mod names in load order.
    pub fn load_order(&self) -> Vec<&str> {
        self.mods.iter().map(|m| m.descriptor.name()).collect()
    }

    /// Descriptors in load order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModDescriptor> {
        self.mods.iter().map(|m| &m.descriptor)
    }

    /// The last phase that completed.
    pub fn completed_phase(&self) -> Option<LoadPhase> {
        self.completed
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Runs `phase` for every mod, in load order.
    ///
    /// # Errors
    ///
    /// - [`LoaderError::PhaseOutOfOrder`] if `phase` is not the next phase
    /// - [`LoaderError::HookFailed`] on the first failing sync hook
    /// - bundle manifest errors at the start of post-database-load
    pub async fn run_phase(
        &mut self,
        phase: LoadPhase,
        registries: &mut LoadRegistries,
    ) -> Result<PhaseReport, LoaderError> {
        let expected = LoadPhase::next_after(self.completed);
        if expected != Some(phase) {
            return Err(LoaderError::PhaseOutOfOrder {
                expected,
                requested: phase,
            });
        }

        if phase == LoadPhase::PostDatabaseLoad {
            for m in self.mods.iter().filter(|m| m.descriptor.is_bundle_mod()) {
                registries.bundles.load_mod_bundles(&m.descriptor).await?;
            }
        }

        info!(%phase, mods = self.mods.len(), "running mod phase");
        let mut report = PhaseReport {
            phase,
            invoked: Vec::with_capacity(self.mods.len()),
            failures: Vec::new(),
        };

        for m in &mut self.mods {
            let mod_name = m.descriptor.name().to_string();
            debug!(%phase, %mod_name, "invoking hooks");

            let mut registrar = ModRegistrar::new(registries, &mut m.scope, &m.descriptor);
            let sync_result = match phase {
                LoadPhase::PreLoad => m.instance.pre_load(&mut registrar),
                LoadPhase::PostDatabaseLoad => m.instance.post_database_load(&mut registrar),
                LoadPhase::PostLoad => m.instance.post_load(&mut registrar),
            };
            if let Err(source) = sync_result {
                return Err(LoaderError::HookFailed {
                    mod_name,
                    phase,
                    source: source.into(),
                });
            }

            let async_result = match phase {
                LoadPhase::PreLoad => m.instance.pre_load_async(&mut registrar).await,
                LoadPhase::PostDatabaseLoad => {
                    m.instance.post_database_load_async(&mut registrar).await
                }
                LoadPhase::PostLoad => m.instance.post_load_async(&mut registrar).await,
            };
            registrar.finish();

            if let Err(err) = async_result {
                error!(%phase, %mod_name, "async hook failed: {err}\n{err:?}");
                report.failures.push(HookFailure {
                    mod_name: mod_name.clone(),
                    message: err.to_string(),
                });
            }
            report.invoked.push(mod_name);
        }

        self.completed = Some(phase);
        info!(%phase, failures = report.failures.len(), "mod phase complete");
        Ok(report)
    }
}

impl fmt::Debug for ModLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModLoader")
            .field("mods", &self.load_order())
            .field("completed", &self.completed)
            .finish()
    }
}
