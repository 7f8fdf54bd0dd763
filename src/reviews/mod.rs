mod aggregation;
mod models;

pub use aggregation::{aggregate, aggregate_skipping_malformed, AggregationOutcome, AlbumKey};
pub use models::{AggregatedAlbum, NewReview, Review, ReviewUpdate, MAX_RATING, MIN_RATING};
