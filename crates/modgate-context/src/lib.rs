//! Bounded-history typed context store.
//!
//! Request-handling code that is otherwise decoupled (a launcher route, a
//! raid-start controller, a mod) passes cross-cutting values through this
//! store: the current session id, the raid configuration the client sent,
//! the timestamp the client started at, and so on.
//!
//! Values are keyed by a closed enum, [`ContextKind`]. For each kind the
//! store keeps the last [`DEFAULT_HISTORY_DEPTH`] values in insertion
//! order; older values are evicted as new ones arrive.
//!
//! ```text
//! add_value(SessionId, "a")   add_value(SessionId, "b")
//!          │                          │
//!          ▼                          ▼
//!   SessionId: [a] ───────────▶ SessionId: [a, b]   get_latest_value → b
//!                                                   get_values       → [a, b]
//! ```
//!
//! # Concurrency
//!
//! The store is shared by every request task. Each kind lives in its own
//! `DashMap` slot, so two appends to different kinds never wait on each
//! other and an append is never observed half-done by a reader.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// How many values are retained per kind unless configured otherwise.
pub const DEFAULT_HISTORY_DEPTH: usize = 10;

// ---------------------------------------------------------------------------
// ContextKind
// ---------------------------------------------------------------------------

/// What a stored context value represents.
///
/// Adding a kind is a change to the core, not something mods can do;
/// mods that need their own shared state use their service scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// The session id of the request currently being handled.
    SessionId,
    /// The raid settings the client chose before matching.
    RaidConfiguration,
    /// When the client reported it started, in epoch milliseconds.
    ClientStartTimestamp,
    /// The last "register player" request body a client sent.
    RegisterPlayerRequest,
    /// Per-raid adjustments computed at raid start.
    RaidAdjustments,
    /// Data carried across a transit between locations.
    TransitInfo,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SessionId => "session_id",
            Self::RaidConfiguration => "raid_configuration",
            Self::ClientStartTimestamp => "client_start_timestamp",
            Self::RegisterPlayerRequest => "register_player_request",
            Self::RaidAdjustments => "raid_adjustments",
            Self::TransitInfo => "transit_info",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// ContextEntry
// ---------------------------------------------------------------------------

/// One stored value plus its bookkeeping.
///
/// Cloning an entry is cheap: the value itself sits behind an `Arc`.
#[derive(Clone)]
pub struct ContextEntry {
    kind: ContextKind,
    value: Arc<dyn Any + Send + Sync>,
    inserted_at: u64,
}

impl ContextEntry {
    /// The kind this entry was stored under.
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Store-wide insertion sequence number. Strictly increasing across
    /// all kinds, so two entries can be ordered even across kinds.
    pub fn inserted_at(&self) -> u64 {
        self.inserted_at
    }

    /// Borrows the value as `T`, or `None` if it was stored as another type.
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns a shared handle to the value as `T`, or `None` on a type
    /// mismatch.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextEntry")
            .field("kind", &self.kind)
            .field("inserted_at", &self.inserted_at)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ContextStore
// ---------------------------------------------------------------------------

/// Process-wide store of typed context values with per-kind bounded history.
pub struct ContextStore {
    entries: DashMap<ContextKind, VecDeque<ContextEntry>>,
    depth: usize,
    sequence: AtomicU64,
}

impl ContextStore {
    /// Creates an empty store retaining [`DEFAULT_HISTORY_DEPTH`] values per kind.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }

    /// Creates an empty store retaining `depth` values per kind.
    ///
    /// A depth of 0 would make every read absent, so it is raised to 1.
    pub fn with_depth(depth: usize) -> Self {
        Self {
            entries: DashMap::new(),
            depth: depth.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    /// How many values are retained per kind.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Appends a value for `kind`, evicting the oldest one when the
    /// kind's history is already full.
    pub fn add_value<T: Any + Send + Sync>(&self, kind: ContextKind, value: T) {
        // The slot guard is held while the sequence number is taken, so
        // per-kind order and sequence order always agree.
        let mut slot = self.entries.entry(kind).or_default();
        let inserted_at = self.sequence.fetch_add(1, Ordering::Relaxed);

        if slot.len() >= self.depth {
            slot.pop_front();
            tracing::trace!(%kind, "context history full, evicted oldest value");
        }

        slot.push_back(ContextEntry {
            kind,
            value: Arc::new(value),
            inserted_at,
        });
    }

    /// Returns the most recently added entry for `kind`, or `None` if the
    /// kind was never written.
    pub fn get_latest_value(&self, kind: ContextKind) -> Option<ContextEntry> {
        self.entries.get(&kind)?.back().cloned()
    }

    /// Returns the retained history for `kind`, oldest first, or `None`
    /// if the kind was never written.
    pub fn get_values(&self, kind: ContextKind) -> Option<Vec<ContextEntry>> {
        let slot = self.entries.get(&kind)?;
        if slot.is_empty() {
            return None;
        }
        Some(slot.iter().cloned().collect())
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore")
            .field("kinds", &self.entries.len())
            .field("depth", &self.depth)
            .finish()
    }
}
