use super::{
    auth::PasswordCredentials,
    permissions::{Permission, UserRole},
    AuthToken, AuthTokenValue, FullUserStore,
};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::time::SystemTime;
use tracing::debug;

pub struct UserManager {
    user_store: Box<dyn FullUserStore>,
}

impl UserManager {
    pub fn new(user_store: Box<dyn FullUserStore>) -> Self {
        Self { user_store }
    }

    pub fn add_user<T: AsRef<str>>(&self, user_handle: T) -> Result<usize> {
        let user_handle = user_handle.as_ref().trim();
        if user_handle.is_empty() {
            bail!("The user handle cannot be empty.");
        }
        if self.user_store.get_user_id(user_handle)?.is_some() {
            bail!("User handle {} already exists.", user_handle);
        }
        self.user_store.create_user(user_handle)
    }

    pub fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.user_store.get_user_id(user_handle)
    }

    pub fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.user_store.get_user_handle(user_id)
    }

    pub fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.user_store.get_all_user_handles()
    }

    /// Sets or replaces the password of an existing user.
    pub fn set_password(&self, user_handle: &str, password: &str) -> Result<()> {
        let user_id = self
            .user_store
            .get_user_id(user_handle)?
            .with_context(|| format!("User with handle {} not found.", user_handle))?;
        let credentials = PasswordCredentials::create(user_id, password)?;
        self.user_store.set_password_credentials(&credentials)
    }

    /// Verifies the password and issues a new token. Returns `Ok(None)` for
    /// an unknown handle, a user without password or a wrong password.
    pub fn login(&self, user_handle: &str, password: &str) -> Result<Option<AuthToken>> {
        let Some(user_id) = self.user_store.get_user_id(user_handle)? else {
            debug!("Login for unknown handle {}", user_handle);
            return Ok(None);
        };
        let Some(credentials) = self.user_store.get_password_credentials(user_id)? else {
            debug!("Login for user {} without password", user_id);
            return Ok(None);
        };
        if !credentials.verify(password)? {
            return Ok(None);
        }

        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.user_store.add_auth_token(&token)?;
        Ok(Some(token))
    }

    pub fn logout(&self, user_id: usize, token_value: &AuthTokenValue) -> Result<()> {
        if !self.user_store.delete_auth_token(user_id, token_value)? {
            bail!(
                "Auth token of user {} not found, nothing to delete.",
                user_id
            );
        }
        Ok(())
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.get_auth_token(value)
    }

    pub fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store.update_auth_token_last_used(value)
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        self.user_store.get_user_roles(user_id)
    }

    pub fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.add_user_role(user_id, role)
    }

    pub fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        self.user_store.remove_user_role(user_id, role)
    }

    /// Union of the permissions of the user's roles. Users without any role
    /// claim are members.
    pub fn get_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        let mut roles = self.user_store.get_user_roles(user_id)?;
        if roles.is_empty() {
            roles.push(UserRole::Member);
        }
        let mut seen = HashSet::new();
        Ok(roles
            .iter()
            .flat_map(|role| role.permissions().iter().copied())
            .filter(|permission| seen.insert(*permission))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;
    use tempfile::TempDir;

    fn create_manager() -> (UserManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap();
        (UserManager::new(Box::new(store)), temp_dir)
    }

    #[test]
    fn rejects_blank_and_duplicate_handles() {
        let (manager, _dir) = create_manager();
        assert!(manager.add_user("  ").is_err());
        manager.add_user("alice").unwrap();
        assert!(manager.add_user("alice").is_err());
    }

    #[test]
    fn login_issues_token_only_for_right_password() {
        let (manager, _dir) = create_manager();
        let alice = manager.add_user("alice").unwrap();
        assert!(manager.login("alice", "pw").unwrap().is_none());

        manager.set_password("alice", "pw").unwrap();
        assert!(manager.login("alice", "wrong").unwrap().is_none());
        assert!(manager.login("nobody", "pw").unwrap().is_none());

        let token = manager.login("alice", "pw").unwrap().unwrap();
        assert_eq!(token.user_id, alice);
        let stored = manager.get_auth_token(&token.value).unwrap().unwrap();
        assert_eq!(stored.user_id, alice);

        manager.logout(alice, &token.value).unwrap();
        assert!(manager.get_auth_token(&token.value).unwrap().is_none());
        assert!(manager.logout(alice, &token.value).is_err());
    }

    #[test]
    fn set_password_requires_existing_user() {
        let (manager, _dir) = create_manager();
        assert!(manager.set_password("ghost", "pw").is_err());
    }

    #[test]
    fn users_without_roles_are_members() {
        let (manager, _dir) = create_manager();
        let alice = manager.add_user("alice").unwrap();
        let permissions = manager.get_user_permissions(alice).unwrap();
        assert!(permissions.contains(&Permission::WriteReviews));
        assert!(permissions.contains(&Permission::LikeContent));

        manager.add_user_role(alice, UserRole::Admin).unwrap();
        manager.add_user_role(alice, UserRole::Moderator).unwrap();
        let permissions = manager.get_user_permissions(alice).unwrap();
        assert_eq!(permissions.len(), 4);
    }
}
