//! Only the concerns that actually changed produce provider calls.

use std::collections::BTreeSet;

use dbu_reconcile::*;

fn acl_a() -> AccessControl {
    AccessControl {
        acl_categories: Some(BTreeSet::from(["+@read".to_string()])),
        acl_channels: Some(BTreeSet::new()),
        acl_commands: Some(BTreeSet::new()),
        acl_keys: Some(BTreeSet::from(["app:*".to_string()])),
    }
}

fn previous() -> UserState {
    UserState {
        database_id: "db1".to_string(),
        username: "alice".to_string(),
        password: "p1".to_string(),
        permission: "read".to_string(),
        access_control: Some(acl_a()),
        ..UserState::default()
    }
}

#[test]
fn permission_only_change_plans_only_permission_call() {
    let mut desired = UserSpec::new("db1", "alice");
    desired.password = Some("p1".to_string());
    desired.permission = Some("write".to_string());
    desired.access_control = Some(acl_a());

    let plan = plan_update(&previous(), &desired).unwrap();
    assert_eq!(plan.steps, vec![UpdateStep::Permission]);
    assert!(!plan.contains(UpdateStep::Password));
    assert!(!plan.contains(UpdateStep::AccessControl));
}

#[test]
fn password_only_change_plans_only_password_call() {
    let mut desired = UserSpec::new("db1", "alice");
    desired.password = Some("p2".to_string());
    desired.permission = Some("read".to_string());

    let plan = plan_update(&previous(), &desired).unwrap();
    assert_eq!(plan.steps, vec![UpdateStep::Password]);
}

#[test]
fn username_change_is_never_planned_in_place() {
    let desired = UserSpec::new("db1", "bob");
    match plan(Some(&previous()), &desired) {
        Plan::Replace { reason } => assert_eq!(
            reason,
            ValidationError::ImmutableFieldChanged {
                field: "username",
                from: "alice".to_string(),
                to: "bob".to_string(),
            }
        ),
        other => panic!("expected replace, got {other:?}"),
    }
}
