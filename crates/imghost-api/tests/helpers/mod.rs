#![allow(dead_code)]

pub mod clock;
pub mod fixtures;
pub mod storage;
pub mod stores;

use axum_test::TestServer;
use clock::ManualClock;
use fixtures::{test_config, ADMIN, ADMIN_PASSWORD};
use imghost_api::constants::API_PREFIX;
use imghost_api::setup::routes::setup_routes;
use imghost_api::{build_state, seed_default_admin, AppState, Stores};
use imghost_storage::Storage;
use std::sync::Arc;
use storage::MemoryStorage;
use stores::{MemoryGuestCodeStore, MemoryImageStore, MemoryStatsStore, MemoryUserStore};
use tempfile::TempDir;

pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Every fake a service under test runs against.
pub struct Fakes {
    pub images: Arc<MemoryImageStore>,
    pub stats: Arc<MemoryStatsStore>,
    pub guest_codes: Arc<MemoryGuestCodeStore>,
    pub users: Arc<MemoryUserStore>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
}

impl Fakes {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at_noon());
        Self {
            images: Arc::new(MemoryImageStore::with_clock(clock.clone())),
            stats: Arc::new(MemoryStatsStore::new()),
            guest_codes: Arc::new(MemoryGuestCodeStore::with_clock(clock.clone())),
            users: Arc::new(MemoryUserStore::with_clock(clock.clone())),
            storage: Arc::new(MemoryStorage::new()),
            clock,
        }
    }

    pub fn stores(&self) -> Stores {
        Stores {
            images: self.images.clone(),
            stats: self.stats.clone(),
            guest_codes: self.guest_codes.clone(),
            users: self.users.clone(),
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub fakes: Fakes,
    pub _upload_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Log in as the administrator and return the bearer header value.
    pub async fn admin_bearer(&self) -> String {
        self.bearer_for(ADMIN, ADMIN_PASSWORD).await
    }

    pub async fn bearer_for(&self, username: &str, password: &str) -> String {
        let response = self
            .server
            .post(&api_path("/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        format!("Bearer {}", body["token"].as_str().unwrap())
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let upload_path = upload_dir.path().to_string_lossy().to_string();

    let mut vars: Vec<(&str, &str)> = vec![("UPLOAD_PATH", upload_path.as_str())];
    vars.extend_from_slice(overrides);
    let config = test_config(&vars);

    let fakes = Fakes::new();
    let state = build_state(config, fakes.stores(), fakes.storage(), fakes.clock.clone());
    seed_default_admin(&state).await.unwrap();
    let router = setup_routes(state.clone()).unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        state,
        fakes,
        _upload_dir: upload_dir,
    }
}
