//! plan / apply / refresh / import / destroy.
//!
//! Output is one `key=value` line per user. The state file is rewritten after
//! every user, including after a failed create that left the user in place.

use std::time::Duration;

use anyhow::{bail, Result};
use dbu_lifecycle::{Applied, LifecycleError, ResourceState};
use dbu_reconcile::{Plan, UnreconciledChange, UpdatePlan};

use super::{Controller, Session};

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

pub fn plan(session: &Session) -> Result<()> {
    let mut counts = [0usize; 5];
    for (name, spec) in &session.users {
        let current = session.state.users.get(name);
        let plan = dbu_reconcile::plan(current.and_then(ResourceState::managed_user), spec);
        let (idx, line) = describe(&plan);
        counts[idx] += 1;
        println!("user={name} {line}");
    }
    for name in orphans(session) {
        counts[4] += 1;
        println!("user={name} action=delete reason=not_in_config");
    }
    println!(
        "plan create={} update={} replace={} unchanged={} delete={}",
        counts[0], counts[1], counts[2], counts[3], counts[4]
    );
    Ok(())
}

fn describe(plan: &Plan) -> (usize, String) {
    match plan {
        Plan::Create => (0, "action=create".to_string()),
        Plan::Update(p) => (1, format!("action=update {}", update_fields(p))),
        Plan::Replace { reason } => (2, format!("action=replace reason=\"{reason}\"")),
        Plan::NoChange => (3, "action=none".to_string()),
    }
}

fn update_fields(p: &UpdatePlan) -> String {
    let steps = p
        .steps
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let mut out = format!("steps={}", if steps.is_empty() { "-" } else { &steps });
    for change in &p.unreconciled {
        match change {
            UnreconciledChange::Encryption { from, to } => out.push_str(&format!(
                " unreconciled=encryption({}->{})",
                from.map(|e| e.as_token()).unwrap_or("unset"),
                to
            )),
        }
    }
    out
}

/// Managed state entries with no config entry.
fn orphans(session: &Session) -> Vec<String> {
    session
        .state
        .managed_names()
        .into_iter()
        .filter(|n| !session.users.contains_key(n))
        .collect()
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

pub async fn apply(
    session: &mut Session,
    controller: &Controller,
    timeout: Option<Duration>,
) -> Result<()> {
    let mut failed = 0usize;

    let users: Vec<_> = session.users.clone().into_iter().collect();
    for (name, spec) in users {
        if session.is_cancelled() {
            break;
        }
        let ctx = session.call_context(timeout);
        let state = session.state.users.entry(name.clone()).or_default();
        let res = controller.apply(&ctx, state, &spec).await;
        if !state.is_managed() {
            session.state.users.remove(&name);
        }
        session.save_state()?;

        match res {
            Ok(Applied::Created) => println!("user={name} applied=create"),
            Ok(Applied::Updated(p)) => {
                println!("user={name} applied=update {}", update_fields(&p))
            }
            Ok(Applied::Replaced) => println!("user={name} applied=replace"),
            Ok(Applied::Unchanged) => println!("user={name} applied=none"),
            Err(e) => {
                failed += 1;
                report_failure(&name, &e);
            }
        }
    }

    for name in orphans(session) {
        if session.is_cancelled() {
            break;
        }
        let ctx = session.call_context(timeout);
        let Some(state) = session.state.users.get_mut(&name) else {
            continue;
        };
        let res = controller.delete(&ctx, state).await;
        if res.is_ok() {
            session.state.users.remove(&name);
        }
        session.save_state()?;
        match res {
            Ok(()) => println!("user={name} applied=delete"),
            Err(e) => {
                failed += 1;
                report_failure(&name, &e);
            }
        }
    }

    finish("apply", session, failed)
}

// ---------------------------------------------------------------------------
// refresh
// ---------------------------------------------------------------------------

pub async fn refresh(
    session: &mut Session,
    controller: &Controller,
    timeout: Option<Duration>,
) -> Result<()> {
    let mut failed = 0usize;

    for name in session.state.managed_names() {
        if session.is_cancelled() {
            break;
        }
        let ctx = session.call_context(timeout);
        let Some(state) = session.state.users.get_mut(&name) else {
            continue;
        };
        match controller.read(&ctx, state).await {
            Ok(()) => println!("user={name} refreshed=true"),
            Err(e) if e.is_not_found() => {
                // Gone remotely: stop tracking so the next apply recreates it.
                session.state.users.remove(&name);
                println!("user={name} refreshed=false removed_from_state=true");
            }
            Err(e) => {
                failed += 1;
                report_failure(&name, &e);
            }
        }
    }

    session.save_state()?;
    finish("refresh", session, failed)
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

pub async fn import(
    session: &mut Session,
    controller: &Controller,
    timeout: Option<Duration>,
    name: &str,
    username: &str,
) -> Result<()> {
    let Some(spec) = session.users.get(name) else {
        bail!("no user named '{name}' in config");
    };
    if session
        .state
        .users
        .get(name)
        .is_some_and(ResourceState::is_managed)
    {
        bail!("user '{name}' is already managed; destroy or edit the state file first");
    }

    let database_id = spec.database_id.clone();
    let ctx = session.call_context(timeout);
    let state = controller.import(&ctx, &database_id, username).await?;
    session.state.users.insert(name.to_string(), state);
    session.save_state()?;
    println!("user={name} imported=true database_id={database_id} username={username}");
    Ok(())
}

// ---------------------------------------------------------------------------
// destroy
// ---------------------------------------------------------------------------

pub async fn destroy(
    session: &mut Session,
    controller: &Controller,
    timeout: Option<Duration>,
    name: Option<&str>,
) -> Result<()> {
    let names = match name {
        Some(n) => {
            if !session.state.users.contains_key(n) {
                bail!("user '{n}' is not in the state file");
            }
            vec![n.to_string()]
        }
        None => session.state.managed_names(),
    };

    let mut failed = 0usize;
    for name in names {
        if session.is_cancelled() {
            break;
        }
        let ctx = session.call_context(timeout);
        let Some(state) = session.state.users.get_mut(&name) else {
            continue;
        };
        let res = controller.delete(&ctx, state).await;
        if res.is_ok() {
            session.state.users.remove(&name);
        }
        session.save_state()?;
        match res {
            Ok(()) => println!("user={name} destroyed=true"),
            Err(e) => {
                failed += 1;
                report_failure(&name, &e);
            }
        }
    }

    finish("destroy", session, failed)
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn report_failure(name: &str, e: &LifecycleError) {
    eprintln!("ERROR user={name}: {e}");
    if e.entity_exists() {
        eprintln!(
            "  user={name} remote={}/{} exists and stays in the state file",
            e.database_id(),
            e.username()
        );
    }
}

fn finish(command: &str, session: &Session, failed: usize) -> Result<()> {
    if session.is_cancelled() {
        bail!("{command} cancelled; state file reflects completed operations only");
    }
    if failed > 0 {
        bail!("{command} failed for {failed} user(s)");
    }
    Ok(())
}
