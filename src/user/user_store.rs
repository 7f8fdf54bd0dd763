use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::permissions::UserRole;
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<usize>;

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>>;

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>>;

    fn get_all_user_handles(&self) -> Result<Vec<String>>;

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>>;

    /// Adding a role the user already holds is a no-op.
    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()>;
}

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns Ok(None) if the user has no password set.
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<PasswordCredentials>>;

    /// Inserts or replaces the password of `credentials.user_id`.
    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    fn add_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Deletes the token only if it belongs to `user_id`. Returns whether a
    /// token was deleted.
    fn delete_auth_token(&self, user_id: usize, value: &AuthTokenValue) -> Result<bool>;

    fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()>;

    /// Deletes tokens not used (or created, if never used) in the last
    /// `unused_for_days` days. Returns the number of deleted tokens.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait FullUserStore: UserStore + UserAuthCredentialsStore + UserAuthTokenStore {}

impl<T> FullUserStore for T where T: UserStore + UserAuthCredentialsStore + UserAuthTokenStore {}
