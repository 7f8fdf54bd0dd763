use super::error::ApiError;
use super::metrics::record_data_error;
use super::session::Session;
use super::state::{GuardedCommunityStore, ServerState};
use crate::community_store::{Comment, LikeState, NewComment};
use crate::reviews::{
    aggregate, aggregate_skipping_malformed, AggregationOutcome, NewReview, Review, ReviewUpdate,
};
use crate::user::Permission;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Deserialize, Debug, Default)]
struct ReviewsQuery {
    author: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct AlbumsQuery {
    /// Fail the whole listing on the first malformed review.
    #[serde(default)]
    strict: bool,
}

#[derive(Serialize, Debug)]
struct ReviewResponse {
    #[serde(flatten)]
    review: Review,
    /// Whether the caller likes the review, false for anonymous callers.
    liked: bool,
}

fn existing_review(store: &GuardedCommunityStore, id: i64) -> Result<Review, ApiError> {
    store.get_review(id)?.ok_or(ApiError::NotFound)
}

async fn list_reviews(
    State(store): State<GuardedCommunityStore>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(store.list_reviews(query.author)?))
}

async fn list_albums(
    State(store): State<GuardedCommunityStore>,
    Query(query): Query<AlbumsQuery>,
) -> Result<Json<AggregationOutcome>, ApiError> {
    let reviews = store.list_reviews(None)?;
    if query.strict {
        let albums = aggregate(&reviews)?;
        return Ok(Json(AggregationOutcome {
            albums,
            skipped: vec![],
            errors: vec![],
        }));
    }

    let outcome = aggregate_skipping_malformed(&reviews);
    outcome.errors.iter().for_each(record_data_error);
    Ok(Json(outcome))
}

async fn get_review(
    session: Option<Session>,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = existing_review(&store, id)?;
    let liked = match &session {
        Some(session) => store.has_liked(id, session.user_id)?,
        None => false,
    };
    Ok(Json(ReviewResponse { review, liked }))
}

async fn post_review(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Json(body): Json<NewReview>,
) -> Result<Response, ApiError> {
    session.require_permission(Permission::WriteReviews)?;
    body.validate().map_err(ApiError::invalid)?;
    let review = store.insert_review(session.user_id, &body)?;
    info!(
        "User {} reviewed {} - {} ({})",
        session.user_id, review.artist_name, review.album_name, review.id
    );
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

async fn put_review(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
    Json(body): Json<ReviewUpdate>,
) -> Result<Json<Review>, ApiError> {
    let review = existing_review(&store, id)?;
    if !session.can_modify(review.user_id) {
        return Err(ApiError::Forbidden);
    }
    body.validate().map_err(ApiError::invalid)?;
    store
        .update_review(id, &body)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_review(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let review = existing_review(&store, id)?;
    if !session.can_modify(review.user_id) {
        return Err(ApiError::Forbidden);
    }
    if !store.delete_review(id)? {
        return Err(ApiError::NotFound);
    }
    debug!("User {} deleted review {}", session.user_id, id);
    Ok(StatusCode::NO_CONTENT)
}

async fn like_review(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<Json<LikeState>, ApiError> {
    session.require_permission(Permission::LikeContent)?;
    store
        .like_review(id, session.user_id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn unlike_review(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<Json<LikeState>, ApiError> {
    session.require_permission(Permission::LikeContent)?;
    store
        .unlike_review(id, session.user_id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn list_comments(
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    existing_review(&store, id)?;
    Ok(Json(store.list_comments(id)?))
}

async fn post_comment(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
    Json(body): Json<NewComment>,
) -> Result<Response, ApiError> {
    session.require_permission(Permission::PostComments)?;
    body.validate().map_err(ApiError::invalid)?;
    match store.add_comment(id, session.user_id, &body)? {
        Some(comment) => Ok((StatusCode::CREATED, Json(comment)).into_response()),
        None => Err(ApiError::NotFound),
    }
}

/// Routes nested under `/v1/reviews`.
pub fn make_review_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_reviews).post(post_review))
        .route("/albums", get(list_albums))
        .route(
            "/{id}",
            get(get_review).put(put_review).delete(delete_review),
        )
        .route("/{id}/like", post(like_review).delete(unlike_review))
        .route("/{id}/comments", get(list_comments).post(post_comment))
        .with_state(state)
}
