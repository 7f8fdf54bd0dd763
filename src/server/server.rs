use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::metrics::record_login_attempt;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::{
    log_requests, make_community_routes, make_festival_routes, make_review_routes, state::*,
};
use crate::user::auth::AuthTokenValue;
use crate::user::{Permission, UserRole};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub user_id: Option<usize>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Serialize)]
struct SessionInfo {
    user_id: usize,
    user_handle: Option<String>,
    roles: Vec<UserRole>,
    permissions: Vec<Permission>,
    is_admin: bool,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
        user_id: session.map(|s| s.user_id),
    };
    Json(stats)
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<LoginBody>,
) -> Response {
    debug!("login() called for {}", body.user_handle);
    let start = Instant::now();
    let login_result = user_manager
        .lock()
        .unwrap()
        .login(&body.user_handle, &body.password);

    match login_result {
        Ok(Some(auth_token)) => {
            record_login_attempt("success", start.elapsed());
            info!("User {} logged in", auth_token.user_id);
            let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, auth_token.value.0.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (
                StatusCode::CREATED,
                [(header::SET_COOKIE, cookie.to_string())],
                Json(LoginSuccessResponse {
                    token: auth_token.value.0,
                }),
            )
                .into_response()
        }
        Ok(None) => {
            record_login_attempt("failure", start.elapsed());
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(err) => {
            record_login_attempt("error", start.elapsed());
            error!("Error during login: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn logout(State(user_manager): State<GuardedUserManager>, session: Session) -> Response {
    let locked_manager = user_manager.lock().unwrap();
    match locked_manager.logout(session.user_id, &AuthTokenValue(session.token)) {
        Ok(()) => {
            let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
                .same_site(SameSite::Lax)
                .build();
            (StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]).into_response()
        }
        Err(err) => {
            debug!("Logout failed: {}", err);
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

async fn get_session(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> Response {
    let user_handle = match user_manager.lock().unwrap().get_user_handle(session.user_id) {
        Ok(handle) => handle,
        Err(err) => {
            error!("Failed to read handle of user {}: {:#}", session.user_id, err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    Json(SessionInfo {
        user_id: session.user_id,
        user_handle,
        roles: session.roles,
        permissions: session.permissions,
        is_admin: session.is_admin,
    })
    .into_response()
}

pub fn make_app(state: ServerState) -> Router {
    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state.clone());

    let home_router: Router = match &state.config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/reviews", make_review_routes(state.clone()))
        .nest("/v1/festivals", make_festival_routes(state.clone()))
        .merge(make_community_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Serving the API on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
