//! dbu-lifecycle
//!
//! Create, read, update and delete of one database user against a
//! [`dbu_client::DatabaseApi`], plus the state-store record that tracks it.
//!
//! - One remote call per changed concern, awaited in order.
//! - First failing call wins; earlier calls are not rolled back.
//! - Progress goes to an injected [`EventSink`], never a global logger.

mod controller;
mod error;
mod events;
mod reconciler;
mod state;

pub use controller::{Applied, LifecycleController};
pub use error::LifecycleError;
pub use events::{
    EventKind, EventSink, LifecycleEvent, NullSink, Operation, RemoteCall, TracingSink,
};
pub use reconciler::Reconciler;
pub use state::ResourceState;
