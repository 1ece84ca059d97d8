//! Scenario: deleting a user that is already gone succeeds.
//!
//! # Invariant under test
//! `DeleteUser` answering not-found completes the delete without error, and
//! the state record is cleared either way.

use dbu_client::CallContext;
use dbu_lifecycle::{EventKind, LifecycleController, RemoteCall, ResourceState};
use dbu_reconcile::UserSpec;
use dbu_testkit::{FakeDatabase, FakeDatabaseApi, RecordingSink};

fn controller() -> LifecycleController<FakeDatabaseApi, RecordingSink> {
    let api = FakeDatabaseApi::new().with_database("db1", FakeDatabase::mysql());
    LifecycleController::new(api, RecordingSink::new())
}

#[tokio::test]
async fn deleting_twice_succeeds_both_times() {
    let c = controller();
    let ctx = CallContext::new();
    let mut state = ResourceState::default();
    c.create(&ctx, &mut state, &UserSpec::new("db1", "alice"))
        .await
        .unwrap();

    let mut stale = state.clone();
    c.delete(&ctx, &mut state).await.unwrap();
    assert!(!state.is_managed());
    assert!(c.reconciler().api().user("db1", "alice").is_none());

    // A second record still pointing at the deleted user.
    c.delete(&ctx, &mut stale).await.unwrap();
    assert!(!stale.is_managed());
    assert!(c.reconciler().sink().kinds().contains(&EventKind::AlreadyGone));
}

#[tokio::test]
async fn user_removed_out_of_band_deletes_cleanly() {
    let c = controller();
    let ctx = CallContext::new();
    let mut state = ResourceState::default();
    c.create(&ctx, &mut state, &UserSpec::new("db1", "alice"))
        .await
        .unwrap();

    c.reconciler().api().drop_user("db1", "alice");
    c.reconciler().api().clear_calls();

    c.delete(&ctx, &mut state).await.unwrap();
    assert_eq!(c.reconciler().api().call_names(), vec![RemoteCall::DeleteUser]);
}

#[tokio::test]
async fn other_delete_failures_are_surfaced() {
    let c = controller();
    let ctx = CallContext::new();
    let mut state = ResourceState::adopted("db1", "alice");
    c.reconciler().api().fail_next(
        RemoteCall::DeleteUser,
        dbu_client::ClientError::Api {
            status: 500,
            message: "internal".to_string(),
        },
    );

    let err = c.delete(&ctx, &mut state).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(state.is_managed(), "record kept when delete failed");
}
