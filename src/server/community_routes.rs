use super::error::ApiError;
use super::session::Session;
use super::state::{GuardedCommunityStore, ServerState};
use crate::community_store::{NewNotice, Notice, NoticeUpdate, Profile, ProfileUpdate};
use crate::user::Permission;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize, Debug)]
struct NoticeOrderBody {
    ids: Vec<i64>,
}

#[derive(Deserialize, Debug)]
struct MoveNoticeBody {
    position: usize,
}

async fn list_notices(
    State(store): State<GuardedCommunityStore>,
) -> Result<Json<Vec<Notice>>, ApiError> {
    Ok(Json(store.list_notices()?))
}

async fn get_notice(
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<Json<Notice>, ApiError> {
    store.get_notice(id)?.map(Json).ok_or(ApiError::NotFound)
}

async fn post_notice(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Json(body): Json<NewNotice>,
) -> Result<Response, ApiError> {
    session.require_admin()?;
    body.validate().map_err(ApiError::invalid)?;
    let notice = store.insert_notice(&body)?;
    Ok((StatusCode::CREATED, Json(notice)).into_response())
}

async fn put_notice(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
    Json(body): Json<NoticeUpdate>,
) -> Result<Json<Notice>, ApiError> {
    session.require_admin()?;
    if body.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("Notice title cannot be empty".to_string()));
    }
    store
        .update_notice(id, &body)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_notice(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    session.require_admin()?;
    if store.delete_notice(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn put_notice_order(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Json(body): Json<NoticeOrderBody>,
) -> Result<Json<Vec<Notice>>, ApiError> {
    session.require_admin()?;
    if !store.replace_notice_order(&body.ids)? {
        return Err(ApiError::BadRequest(
            "The order must list every notice exactly once".to_string(),
        ));
    }
    info!("Admin {} reordered notices", session.user_id);
    Ok(Json(store.list_notices()?))
}

async fn move_notice(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
    Json(body): Json<MoveNoticeBody>,
) -> Result<Json<Vec<Notice>>, ApiError> {
    session.require_admin()?;
    if !store.move_notice(id, body.position)? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(store.list_notices()?))
}

async fn delete_comment(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let comment = store.get_comment(id)?.ok_or(ApiError::NotFound)?;
    if !session.can_modify(comment.user_id) {
        return Err(ApiError::Forbidden);
    }
    store.delete_comment(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_profile(
    State(store): State<GuardedCommunityStore>,
    Path(user_id): Path<usize>,
) -> Result<Json<Profile>, ApiError> {
    store
        .get_profile(user_id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn put_profile(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    session.require_permission(Permission::EditProfile)?;
    body.validate().map_err(ApiError::invalid)?;
    Ok(Json(store.upsert_profile(session.user_id, &body)?))
}

/// Notices, comments and profiles.
pub fn make_community_routes(state: ServerState) -> Router {
    Router::new()
        .route("/v1/notices", get(list_notices).post(post_notice))
        .route("/v1/notices/order", put(put_notice_order))
        .route(
            "/v1/notices/{id}",
            get(get_notice).put(put_notice).delete(delete_notice),
        )
        .route("/v1/notices/{id}/move", post(move_notice))
        .route("/v1/comments/{id}", delete(delete_comment))
        .route("/v1/profiles/{user_id}", get(get_profile))
        .route("/v1/profile", put(put_profile))
        .with_state(state)
}
