//! dbu-client
//!
//! The remote collaborator of the reconciler: the [`DatabaseApi`] trait, its
//! HTTP implementation, and the caller-owned [`CallContext`] every call runs
//! under.
//!
//! No retries or backoff: a failed call is returned to the caller as-is.

mod api;
mod context;
mod error;
pub mod http;

pub use api::DatabaseApi;
pub use context::CallContext;
pub use error::ClientError;
pub use http::HttpDatabaseApi;

/// Re-exported so callers can build contexts without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;
