pub mod auth;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
mod user_store;

pub use auth::{AuthToken, AuthTokenValue, PasswordCredentials};
pub use permissions::{AdminPolicy, Permission, RoleClaimAdminPolicy, UserRole};
pub use sqlite_user_store::{SqliteUserStore, USER_VERSIONED_SCHEMAS};
pub use user_manager::UserManager;
pub use user_store::{FullUserStore, UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
