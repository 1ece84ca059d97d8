//! Scenario: caller cancellation and deadlines.
//!
//! # Invariant under test
//! Once the operation's context is cancelled no further field-update call is
//! issued; the error carries the same partial-update classification as any
//! other failure. A call still in flight when the deadline passes is dropped.

use std::time::Duration;

use dbu_client::{CallContext, ClientError};
use dbu_lifecycle::{LifecycleController, LifecycleError, RemoteCall, ResourceState};
use dbu_reconcile::{AccessControl, UpdateStep, UserSpec};
use dbu_testkit::{FakeDatabase, FakeDatabaseApi, RecordingSink};

async fn managed() -> (LifecycleController<FakeDatabaseApi, RecordingSink>, ResourceState) {
    let api = FakeDatabaseApi::new().with_database("cache", FakeDatabase::redis());
    let c = LifecycleController::new(api, RecordingSink::new());
    let mut state = ResourceState::default();
    c.create(&CallContext::new(), &mut state, &UserSpec::new("cache", "app"))
        .await
        .unwrap();
    c.reconciler().api().clear_calls();
    (c, state)
}

fn everything_changed() -> UserSpec {
    let mut spec = UserSpec::new("cache", "app");
    spec.password = Some("p2".to_string());
    spec.permission = Some("admin".to_string());
    spec.access_control = Some(AccessControl::default());
    spec
}

#[tokio::test]
async fn cancel_after_password_stops_remaining_steps() {
    let (c, mut state) = managed().await;
    let ctx = CallContext::new();
    c.reconciler()
        .api()
        .cancel_after(RemoteCall::UpdateUser, ctx.token().clone());

    let err = c
        .update(&ctx, &mut state, &everything_changed())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    match err {
        LifecycleError::PartialUpdateFailure {
            completed,
            failed,
            source,
            ..
        } => {
            assert_eq!(completed, vec![UpdateStep::Password]);
            assert_eq!(failed, UpdateStep::AccessControl);
            assert_eq!(source, ClientError::Cancelled);
        }
        other => panic!("expected partial update failure, got {other}"),
    }
    assert_eq!(
        c.reconciler().api().call_names(),
        vec![RemoteCall::UpdateUser]
    );
}

#[tokio::test]
async fn cancelled_before_start_issues_nothing() {
    let (c, mut state) = managed().await;
    let ctx = CallContext::new();
    ctx.cancel();

    let err = c
        .update(&ctx, &mut state, &everything_changed())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::RemoteCallFailure {
            source: ClientError::Cancelled,
            ..
        }
    ));
    assert!(c.reconciler().api().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_drops_a_hanging_call() {
    let (c, mut state) = managed().await;
    c.reconciler().api().hang_on(RemoteCall::UpdateUserAcl);
    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));

    let err = c
        .update(&ctx, &mut state, &everything_changed())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::PartialUpdateFailure {
            source: ClientError::DeadlineExceeded,
            failed: UpdateStep::AccessControl,
            ..
        }
    ));
    // The hanging ACL call was issued; the permission call never was.
    assert_eq!(
        c.reconciler().api().call_names(),
        vec![RemoteCall::UpdateUser, RemoteCall::UpdateUserAcl]
    );
}
