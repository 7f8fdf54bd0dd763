//! Folds individual reviews into per-album cards.
//!
//! Reviews are grouped by a normalized `(artist, album)` pair. Each group
//! carries the mean rating of its members and the display metadata of its
//! most recently created member.

use super::models::{AggregatedAlbum, Review};
use crate::data_error::DataError;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Grouping key: artist and album, trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumKey {
    artist: String,
    album: String,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

impl AlbumKey {
    pub fn new(artist_name: &str, album_name: &str) -> Self {
        AlbumKey {
            artist: normalize(artist_name),
            album: normalize(album_name),
        }
    }

    pub fn of(review: &Review) -> Self {
        Self::new(&review.artist_name, &review.album_name)
    }
}

struct Accumulator {
    album: AggregatedAlbum,
    total_rating: f64,
}

impl Accumulator {
    fn seed(review: &Review, rating: f64) -> Self {
        Accumulator {
            album: AggregatedAlbum {
                id: review.id,
                artist_name: review.artist_name.clone(),
                album_name: review.album_name.clone(),
                cover_image_url: review.cover_image_url.clone(),
                is_cover_hidden: review.is_cover_hidden,
                genre: review.genre.clone(),
                release_year: review.release_year.clone(),
                rating: 0.0,
                review_count: 1,
                created_at: review.created_at,
                reviews: vec![review.clone()],
            },
            total_rating: rating,
        }
    }

    fn add(&mut self, review: &Review, rating: f64) {
        self.total_rating += rating;
        self.album.review_count += 1;
        self.album.reviews.push(review.clone());

        // Equal timestamps go to the review seen last.
        if review.created_at >= self.album.created_at {
            let album = &mut self.album;
            album.id = review.id;
            album.cover_image_url = review.cover_image_url.clone();
            album.is_cover_hidden = review.is_cover_hidden;
            album.genre = review.genre.clone();
            album.created_at = review.created_at;
            album.release_year = review.release_year.clone();
            album.artist_name = review.artist_name.clone();
            album.album_name = review.album_name.clone();
        }
    }

    fn finish(mut self) -> AggregatedAlbum {
        self.album.rating = self.total_rating / self.album.review_count as f64;
        self.album
    }
}

/// Collapses `reviews` into one [`AggregatedAlbum`] per artist and album,
/// most recently updated album first.
///
/// Fails on the first review without a usable rating: a silently coerced
/// rating would corrupt the mean of its whole group.
pub fn aggregate(reviews: &[Review]) -> Result<Vec<AggregatedAlbum>, DataError> {
    let mut positions: HashMap<AlbumKey, usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();

    for review in reviews {
        let rating = review
            .usable_rating()
            .ok_or(DataError::MissingRating {
                review_id: review.id,
            })?;

        match positions.get(&AlbumKey::of(review)) {
            Some(&position) => groups[position].add(review, rating),
            None => {
                positions.insert(AlbumKey::of(review), groups.len());
                groups.push(Accumulator::seed(review, rating));
            }
        }
    }

    let mut albums: Vec<AggregatedAlbum> = groups.into_iter().map(Accumulator::finish).collect();
    albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(albums)
}

/// Result of aggregating while dropping malformed reviews.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationOutcome {
    pub albums: Vec<AggregatedAlbum>,
    /// Ids of the reviews left out.
    pub skipped: Vec<i64>,
    #[serde(skip)]
    pub errors: Vec<DataError>,
}

/// Aggregates every review with a usable rating and reports the others.
///
/// This is the degraded mode used when rendering listings: one broken row
/// hides itself instead of taking the whole page down.
pub fn aggregate_skipping_malformed(reviews: &[Review]) -> AggregationOutcome {
    let mut errors = Vec::new();
    let mut skipped = Vec::new();
    let mut usable = Vec::with_capacity(reviews.len());
    for review in reviews {
        if review.usable_rating().is_some() {
            usable.push(review.clone());
        } else {
            let err = DataError::MissingRating {
                review_id: review.id,
            };
            warn!("Skipping review in aggregation: {}", err);
            skipped.push(review.id);
            errors.push(err);
        }
    }

    let albums = match aggregate(&usable) {
        Ok(albums) => albums,
        // Every remaining review has a usable rating.
        Err(_) => Vec::new(),
    };

    AggregationOutcome {
        albums,
        skipped,
        errors,
    }
}
