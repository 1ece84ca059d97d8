//! Scenario: an ACL update replaces the remote ACL wholesale.
//!
//! # Invariant under test
//! Going from block A to block B, where B omits a set A declared, sends that
//! set as `[]`. The provider ends up holding exactly B, never a merge.

use dbu_client::CallContext;
use dbu_lifecycle::{LifecycleController, RemoteCall, ResourceState};
use dbu_reconcile::{AccessControl, UserSpec};
use dbu_testkit::{FakeDatabase, FakeDatabaseApi, RecordingSink};
use serde_json::json;
use std::collections::BTreeSet;

fn set(items: &[&str]) -> Option<BTreeSet<String>> {
    Some(items.iter().map(|s| s.to_string()).collect())
}

fn spec(acl: AccessControl) -> UserSpec {
    let mut spec = UserSpec::new("cache", "app");
    spec.access_control = Some(acl);
    spec
}

#[tokio::test]
async fn dropped_set_is_cleared_remotely() {
    let api = FakeDatabaseApi::new().with_database("cache", FakeDatabase::redis());
    let c = LifecycleController::new(api, RecordingSink::new());
    let ctx = CallContext::new();

    let a = AccessControl {
        acl_categories: set(&["+@read"]),
        acl_channels: set(&["events:*"]),
        acl_commands: set(&["+get"]),
        acl_keys: set(&["app:*"]),
    };
    let mut state = ResourceState::default();
    c.create(&ctx, &mut state, &spec(a.clone())).await.unwrap();

    let b = AccessControl {
        acl_channels: None,
        ..a
    };
    c.reconciler().api().clear_calls();
    c.update(&ctx, &mut state, &spec(b)).await.unwrap();

    let calls = c.reconciler().api().calls();
    assert_eq!(
        calls.iter().map(|c| c.call).collect::<Vec<_>>(),
        vec![RemoteCall::UpdateUserAcl, RemoteCall::GetUser]
    );
    assert_eq!(
        calls[0].body,
        json!({
            "acl_categories": ["+@read"],
            "acl_channels": [],
            "acl_commands": ["+get"],
            "acl_keys": ["app:*"]
        })
    );

    let remote = c
        .reconciler()
        .api()
        .user("cache", "app")
        .unwrap()
        .access_control
        .unwrap();
    assert!(remote.acl_channels.is_empty());
    assert_eq!(state.user.access_control.unwrap().acl_channels, set(&[]));
}

#[tokio::test]
async fn acl_on_engine_without_acl_support_fails_the_update() {
    let api = FakeDatabaseApi::new().with_database("db1", FakeDatabase::mysql());
    let c = LifecycleController::new(api, RecordingSink::new());
    let ctx = CallContext::new();
    let mut state = ResourceState::default();
    c.create(&ctx, &mut state, &UserSpec::new("db1", "app"))
        .await
        .unwrap();

    let mut desired = UserSpec::new("db1", "app");
    desired.access_control = Some(AccessControl::default());
    let err = c.update(&ctx, &mut state, &desired).await.unwrap_err();
    assert!(matches!(
        err.client_error(),
        Some(dbu_client::ClientError::Api { status: 400, .. })
    ));
}
