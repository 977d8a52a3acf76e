//! Exercises `Config::from_env` + `build_state` end to end, rather than the
//! hand-assembled `AppState` the other integration tests use via
//! `tests/common/mod.rs` — catches wiring regressions between an environment
//! variable and the adapter/binding it's supposed to populate.

use kortix_gateway::build_state;
use kortix_gateway::config::Config;
use std::sync::Mutex;

/// `std::env::set_var`/`remove_var` affect the whole process, so tests that
/// touch the environment share this lock to avoid interleaving.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn brave_api_key_wires_up_both_search_adapters() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("BRAVE_API_KEY", "test-brave-key");

    let config = Config::from_env();
    let state = build_state(&config);

    assert!(state.web_search.is_some(), "BRAVE_API_KEY should construct the web search adapter");
    assert!(state.image_search.is_some(), "BRAVE_API_KEY should construct the image search adapter");

    std::env::remove_var("BRAVE_API_KEY");
}

#[test]
fn missing_brave_api_key_leaves_search_adapters_unconfigured() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("BRAVE_API_KEY");

    let config = Config::from_env();
    let state = build_state(&config);

    assert!(state.web_search.is_none());
    assert!(state.image_search.is_none());
}
