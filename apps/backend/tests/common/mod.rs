#![allow(dead_code)]

use std::time::SystemTime;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use dispatch_backend::domain::{Actor, Role};
use dispatch_backend::{mint_access_token, AppState};

// Logging is auto-installed for every test binary that includes this module.
#[ctor::ctor]
fn init_logging() {
    static INITIALIZED: OnceCell<()> = OnceCell::new();
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

pub fn actor(role: Role) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role,
    }
}

/// Mint a bearer header value for the given actor against this state's
/// signing key.
pub fn bearer_for(state: &AppState, actor: &Actor) -> String {
    let token = mint_access_token(actor, SystemTime::now(), &state.security)
        .expect("token minting failed");
    format!("Bearer {token}")
}

/// Assert the RFC 7807 problem-details shape our error responses carry.
pub fn assert_problem_details(json: &Value, status: u16, code: &str) {
    assert_eq!(json["status"], status, "problem status: {json}");
    assert_eq!(json["code"], code, "problem code: {json}");
    assert!(
        json["type"]
            .as_str()
            .is_some_and(|t| t.starts_with("https://")),
        "problem type should be a URL: {json}"
    );
    assert!(json["title"].as_str().is_some(), "missing title: {json}");
    assert!(json["detail"].as_str().is_some(), "missing detail: {json}");
    assert!(
        json["trace_id"].as_str().is_some_and(|t| !t.is_empty()),
        "missing trace_id: {json}"
    );
}
