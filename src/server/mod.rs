pub mod config;
mod community_routes;
mod error;
mod festival_routes;
mod http_layers;
pub mod metrics;
mod review_routes;
pub mod server;
pub(self) mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub(self) use community_routes::make_community_routes;
pub(self) use festival_routes::make_festival_routes;
pub(self) use review_routes::make_review_routes;
pub use server::{make_app, run_server};
pub use session::{Session, COOKIE_SESSION_TOKEN_KEY, HEADER_SESSION_TOKEN_KEY};
pub use state::{Clock, FixedClock, ServerState, SystemClock};
