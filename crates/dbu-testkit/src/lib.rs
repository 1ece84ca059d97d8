//! Test doubles for the database-user lifecycle.
//!
//! [`FakeDatabaseApi`] stands in for the provider and [`RecordingSink`]
//! captures lifecycle events. Scenario tests live under `tests/`.

mod fake_api;
mod sink;

pub use fake_api::{FakeDatabase, FakeDatabaseApi, RecordedCall, DEFAULT_LABEL, LEGACY_LABEL};
pub use sink::RecordingSink;
