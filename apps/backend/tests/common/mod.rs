//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up the router over an in-memory card store
//! - A manual clock so tests control "now"
//! - Owner header helpers

pub mod fixtures;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use review_backend::config::Config;
use review_backend::routes::owner::OWNER_HEADER;
use review_backend::services::sessions::SessionRegistry;
use review_backend::{build_router, AppState};
use review_core::{Card, ManualClock, MemoryCardStore, NewCard};

/// Fixed starting point for the test clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Test context containing the in-memory store, the clock and the router.
pub struct TestContext {
    pub store: Arc<MemoryCardStore>,
    pub clock: Arc<ManualClock>,
    sessions: Arc<SessionRegistry>,
    app: Router,
}

impl TestContext {
    /// Create a new test context with the default config.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryCardStore::with_clock(clock.clone()));
        let state = AppState::new(store.clone(), clock.clone(), config);

        Self {
            store,
            clock,
            sessions: state.sessions.clone(),
            app: build_router(state),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Sessions currently held by the router.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Header identifying `owner`.
    pub fn owner_header(owner: Uuid) -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(OWNER_HEADER),
            HeaderValue::from_str(&owner.to_string()).unwrap(),
        )
    }

    /// Put a card straight into the store with the given schedule.
    pub fn seed_card(&self, owner: Uuid, front: &str, next_due: Option<DateTime<Utc>>) -> Card {
        let mut card = Card::create(
            Uuid::new_v4(),
            NewCard {
                owner,
                front: front.to_string(),
                back: format!("{front} (back)"),
                path_id: None,
                tags: Vec::new(),
            },
            t0(),
        );
        if let Some(due) = next_due {
            card.last_reviewed = Some(due - chrono::Duration::days(2));
            card.review_count = 1;
        }
        card.next_due = next_due;
        self.store.insert(card.clone());
        card
    }
}
