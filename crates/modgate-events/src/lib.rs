//! # modgate-events
//!
//! The item-event router: clients post a batch of named actions
//! (move an item, eat, heal, trade ...) and the router runs each one
//! against the session's player-state document, in order, through the
//! first [`ActionHandlerGroup`] that declares it.
//!
//! # Key types
//!
//! - [`EventActionRouter`]: runs a batch, returns a [`BatchOutcome`]
//! - [`ActionHandlerGroup`]: what feature controllers implement
//! - [`ActionGroupRegistry`]: registered groups, first match wins
//! - [`PlayerStateAccessor`]: where player-state documents come from
//! - [`EventOutputHolder`]: per-session output accumulator
//! - [`classify`]: critical vs non-critical warnings

mod batch;
mod classify;
mod error;
mod group;
mod output;
mod player;
mod router;

pub use batch::{
    ActionRequest, HandledAction, ITEM_EVENT_ROUTE, ItemEventBatch, ItemEventOutput, OutputSummary,
};
pub use classify::{Classification, NON_CRITICAL_WARNING_CODES, classify, is_non_critical};
pub use error::{BoxError, EventError};
pub use group::{ActionGroupRegistry, ActionHandlerGroup};
pub use output::EventOutputHolder;
pub use player::{InMemoryPlayerStates, PlayerStateAccessor, PlayerStateHandle};
pub use router::{BatchFailurePolicy, BatchOutcome, EventActionRouter};
