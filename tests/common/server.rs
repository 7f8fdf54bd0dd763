//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases and a clock
//! that only moves when the test says so.

use super::constants::*;
use super::fixtures::{create_test_users, TestUsers};
use chrono::{DateTime, FixedOffset, Utc};
use ditchfork_server::community_store::SqliteCommunityStore;
use ditchfork_server::festivals::FestivalClassifier;
use ditchfork_server::server::{
    make_app, FixedClock, RequestsLoggingLevel, ServerConfig, ServerState,
};
use ditchfork_server::user::{RoleClaimAdminPolicy, SqliteUserStore, UserManager, UserRole};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Path of the community database, for raw fixture rows
    pub community_db_path: PathBuf,

    /// Controls "now" as seen by festival classification
    pub clock: Arc<FixedClock>,

    pub test_user_id: usize,
    pub other_user_id: usize,
    pub admin_user_id: usize,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the databases cannot be created, binding fails or the
    /// server doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let community_db_path = temp_db_dir.path().join("community.db");
        let user_db_path = temp_db_dir.path().join("user.db");

        let TestUsers {
            test_user_id,
            other_user_id,
            admin_user_id,
        } = create_test_users(&user_db_path).expect("Failed to create test users");

        let community_store = Arc::new(
            SqliteCommunityStore::new(&community_db_path)
                .expect("Failed to open community store"),
        );
        let user_store = SqliteUserStore::new(&user_db_path).expect("Failed to open user store");

        let now: DateTime<Utc> = TEST_NOW.parse().expect("Invalid TEST_NOW");
        let clock = Arc::new(FixedClock::new(now));
        let offset = FixedOffset::east_opt(TEST_UTC_OFFSET_MINUTES * 60)
            .expect("Invalid test offset");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = ServerState::new(
            ServerConfig {
                port,
                requests_logging_level: RequestsLoggingLevel::None,
                frontend_dir_path: None,
            },
            community_store,
            UserManager::new(Box::new(user_store)),
            Arc::new(RoleClaimAdminPolicy::new(vec![UserRole::Admin])),
            FestivalClassifier::new(offset),
            clock.clone(),
        );
        let app = make_app(state);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            community_db_path,
            clock,
            test_user_id,
            other_user_id,
            admin_user_id,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Moves the server's clock.
    #[allow(dead_code)]
    pub fn set_now(&self, now: &str) {
        self.clock.set(now.parse().expect("Invalid instant"));
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
