//! `dbu apply` end to end against a local mock provider.
//!
//! GREEN when a declared user is created, read back, and recorded in the
//! state file under its config name; a second apply is a no-op.

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;

fn user_body() -> Value {
    json!({
        "user": {
            "username": "alice",
            "password": "generated",
            "encryption": "Default (MySQL 8+)",
            "permission": ""
        }
    })
}

#[test]
fn apply_creates_user_and_writes_state() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/databases/db1/users")
            .header("authorization", "Bearer test-key")
            .json_body(json!({ "username": "alice", "encryption": "caching_sha2_password" }));
        then.status(202).json_body(user_body());
    });
    let get = server.mock(|when, then| {
        when.method(GET).path("/databases/db1/users/alice");
        then.status(200).json_body(user_body());
    });

    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("base.yaml");
    fs::write(
        &cfg,
        format!(
            "provider:\n  base_url: \"{}\"\n  api_key_env: DBU_TEST_API_KEY\nusers:\n  alice:\n    database_id: db1\n    username: alice\n    encryption: caching_sha2_password\n",
            server.base_url()
        ),
    )
    .unwrap();
    let cfg = cfg.to_string_lossy().into_owned();

    Command::cargo_bin("dbu")
        .unwrap()
        .current_dir(dir.path())
        .env("DBU_TEST_API_KEY", "test-key")
        .args(["apply", "--config", &cfg])
        .assert()
        .success()
        .stdout(predicate::str::contains("user=alice applied=create"));

    create.assert();
    get.assert();

    let state: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("dbu-state.json")).unwrap())
            .unwrap();
    assert_eq!(state["users"]["alice"]["id"], json!("alice"));
    assert_eq!(
        state["users"]["alice"]["user"]["encryption"],
        json!("caching_sha2_password")
    );

    Command::cargo_bin("dbu")
        .unwrap()
        .current_dir(dir.path())
        .env("DBU_TEST_API_KEY", "test-key")
        .args(["apply", "--config", &cfg])
        .assert()
        .success()
        .stdout(predicate::str::contains("user=alice applied=none"));
    create.assert_hits(1);
}

#[test]
fn failed_acl_follow_up_keeps_user_in_state_and_names_it() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/databases/cache/users");
        then.status(202).json_body(json!({
            "user": { "username": "worker", "password": "generated", "encryption": "" }
        }));
    });
    let acl = server.mock(|when, then| {
        when.method(PUT)
            .path("/databases/cache/users/worker/access-control");
        then.status(500).json_body(json!({ "error": "acl backend down" }));
    });

    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("base.yaml");
    fs::write(
        &cfg,
        format!(
            "provider:\n  base_url: \"{}\"\n  api_key_env: DBU_TEST_API_KEY\nusers:\n  worker:\n    database_id: cache\n    username: worker\n    access_control:\n      - acl_keys: [\"jobs:*\"]\n",
            server.base_url()
        ),
    )
    .unwrap();
    let cfg = cfg.to_string_lossy().into_owned();

    Command::cargo_bin("dbu")
        .unwrap()
        .current_dir(dir.path())
        .env("DBU_TEST_API_KEY", "test-key")
        .args(["apply", "--config", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("acl backend down"))
        .stderr(predicate::str::contains(
            "user=worker remote=cache/worker exists and stays in the state file",
        ));

    create.assert();
    acl.assert();

    let state: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("dbu-state.json")).unwrap())
            .unwrap();
    assert_eq!(state["users"]["worker"]["id"], json!("worker"));
}
