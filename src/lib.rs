//! Ditchfork Server Library
//!
//! Album reviews and festival listings for the Ditchfork community. This
//! library exposes the internal modules for the binaries and for testing.

pub mod community_store;
pub mod config;
pub mod data_error;
pub mod festivals;
pub mod reviews;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use community_store::{CommunityStore, SqliteCommunityStore};
pub use data_error::DataError;
pub use festivals::FestivalClassifier;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerState};
pub use user::{SqliteUserStore, UserManager, UserRole};
