use axum::extract::FromRef;
use chrono::{DateTime, Utc};

use crate::community_store::CommunityStore;
use crate::festivals::FestivalClassifier;
use crate::user::{AdminPolicy, UserManager};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::ServerConfig;

/// Source of "now" for festival classification.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub type GuardedCommunityStore = Arc<dyn CommunityStore>;
pub type GuardedUserManager = Arc<Mutex<UserManager>>;
pub type GuardedAdminPolicy = Arc<dyn AdminPolicy>;
pub type GuardedClock = Arc<dyn Clock>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub community_store: GuardedCommunityStore,
    pub user_manager: GuardedUserManager,
    pub admin_policy: GuardedAdminPolicy,
    pub classifier: FestivalClassifier,
    pub clock: GuardedClock,
    pub version: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        community_store: GuardedCommunityStore,
        user_manager: UserManager,
        admin_policy: GuardedAdminPolicy,
        classifier: FestivalClassifier,
        clock: GuardedClock,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            community_store,
            user_manager: Arc::new(Mutex::new(user_manager)),
            admin_policy,
            classifier,
            clock,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedCommunityStore {
    fn from_ref(input: &ServerState) -> Self {
        input.community_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for FestivalClassifier {
    fn from_ref(input: &ServerState) -> Self {
        input.classifier
    }
}

impl FromRef<ServerState> for GuardedClock {
    fn from_ref(input: &ServerState) -> Self {
        input.clock.clone()
    }
}
