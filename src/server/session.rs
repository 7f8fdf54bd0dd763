use super::error::ApiError;
use super::state::ServerState;
use crate::user::auth::AuthTokenValue;
use crate::user::{Permission, UserRole};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

#[derive(Debug)]
pub struct Session {
    pub user_id: usize,
    pub token: String,
    pub roles: Vec<UserRole>,
    pub permissions: Vec<Permission>,
    pub is_admin: bool,
}

impl Session {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            debug!("User {} lacks permission {:?}", self.user_id, permission);
            Err(ApiError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Authors can edit their own content, admins can edit anything.
    pub fn can_modify(&self, owner_id: usize) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    NotAuthenticated,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::NotAuthenticated => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .map(|v| match v.strip_prefix("Bearer ") {
            Some(token) => token.trim().to_string(),
            None => v.trim().to_string(),
        })
        .filter(|v| !v.is_empty())
}

fn extract_session_from_request_parts(parts: &Parts, ctx: &ServerState) -> Option<Session> {
    let token = match extract_session_token_from_cookies(parts)
        .or_else(|| extract_session_token_from_headers(parts))
    {
        None => {
            debug!("No token in cookies nor headers.");
            return None;
        }
        Some(x) => x,
    };

    let user_manager = ctx.user_manager.lock().unwrap();
    let auth_token_value = AuthTokenValue(token);
    let auth_token = match user_manager.get_auth_token(&auth_token_value) {
        Ok(Some(token)) => {
            if let Err(e) = user_manager.update_auth_token_last_used(&auth_token_value) {
                debug!("Failed to update auth token last_used timestamp: {}", e);
            }
            token
        }
        Ok(None) => {
            debug!("Auth token not found in database");
            return None;
        }
        Err(e) => {
            debug!("Failed to get auth token from database: {}", e);
            return None;
        }
    };

    let roles = match user_manager.get_user_roles(auth_token.user_id) {
        Ok(roles) => roles,
        Err(e) => {
            debug!("Failed to get roles of user_id={}: {}", auth_token.user_id, e);
            return None;
        }
    };
    let permissions = match user_manager.get_user_permissions(auth_token.user_id) {
        Ok(perms) => perms,
        Err(e) => {
            debug!(
                "Failed to resolve permissions for user_id={}: {}",
                auth_token.user_id, e
            );
            return None;
        }
    };
    let is_admin = ctx.admin_policy.is_admin(&roles);

    Some(Session {
        user_id: auth_token.user_id,
        token: auth_token.value.0,
        roles,
        permissions,
        is_admin,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .ok_or(SessionExtractionError::NotAuthenticated)
    }
}

impl axum::extract::OptionalFromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx))
    }
}
