use super::error::ApiError;
use super::metrics::record_data_error;
use super::session::Session;
use super::state::{GuardedClock, GuardedCommunityStore, ServerState};
use crate::data_error::DataError;
use crate::festivals::{ClassifiedFestival, FestivalClassifier, FestivalPhase, NewFestival};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Deserialize, Debug, Default)]
struct FestivalsQuery {
    tab: Option<FestivalPhase>,
}

#[derive(Serialize, Debug)]
struct RejectedRecord {
    kind: &'static str,
    message: String,
}

impl From<&DataError> for RejectedRecord {
    fn from(err: &DataError) -> Self {
        RejectedRecord {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
struct FestivalTabResponse {
    tab: FestivalPhase,
    now: DateTime<Utc>,
    festivals: Vec<ClassifiedFestival>,
    rejected: Vec<RejectedRecord>,
}

async fn list_festivals(
    State(store): State<GuardedCommunityStore>,
    State(classifier): State<FestivalClassifier>,
    State(clock): State<GuardedClock>,
    Query(query): Query<FestivalsQuery>,
) -> Result<Json<FestivalTabResponse>, ApiError> {
    let tab = query.tab.unwrap_or_default();
    let now = clock.now();
    let festivals = store.list_festivals()?;
    let listing = classifier.listing_order(&festivals, tab, now);

    for err in &listing.rejected {
        warn!("Festival left out of the {:?} tab: {}", tab, err);
        record_data_error(err);
    }

    Ok(Json(FestivalTabResponse {
        tab,
        now,
        festivals: listing.festivals,
        rejected: listing.rejected.iter().map(RejectedRecord::from).collect(),
    }))
}

async fn get_festival(
    State(store): State<GuardedCommunityStore>,
    State(classifier): State<FestivalClassifier>,
    State(clock): State<GuardedClock>,
    Path(id): Path<i64>,
) -> Result<Json<ClassifiedFestival>, ApiError> {
    let festival = store.get_festival(id)?.ok_or(ApiError::NotFound)?;
    let status = classifier.classify(&festival, clock.now())?;
    Ok(Json(ClassifiedFestival { festival, status }))
}

async fn post_festival(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    State(classifier): State<FestivalClassifier>,
    Json(body): Json<NewFestival>,
) -> Result<Response, ApiError> {
    session.require_admin()?;
    body.validate(&classifier).map_err(ApiError::invalid)?;
    let festival = store.insert_festival(&body)?;
    info!("Admin {} added festival {} ({})", session.user_id, festival.name, festival.id);
    Ok((StatusCode::CREATED, Json(festival)).into_response())
}

async fn put_festival(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    State(classifier): State<FestivalClassifier>,
    Path(id): Path<i64>,
    Json(body): Json<NewFestival>,
) -> Result<Response, ApiError> {
    session.require_admin()?;
    body.validate(&classifier).map_err(ApiError::invalid)?;
    match store.update_festival(id, &body)? {
        Some(festival) => Ok(Json(festival).into_response()),
        None => Err(ApiError::NotFound),
    }
}

async fn delete_festival(
    session: Session,
    State(store): State<GuardedCommunityStore>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    session.require_admin()?;
    if store.delete_festival(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Routes nested under `/v1/festivals`.
pub fn make_festival_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_festivals).post(post_festival))
        .route(
            "/{id}",
            get(get_festival).put(put_festival).delete(delete_festival),
        )
        .with_state(state)
}
