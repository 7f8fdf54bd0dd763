use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;

/// A single user review as stored in the community database.
///
/// `rating` is optional only because stored rows may be malformed; the
/// aggregation rejects reviews without a usable rating.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: usize,
    /// Comma-joined when the album has more than one artist.
    pub artist_name: String,
    pub album_name: String,
    pub cover_image_url: Option<String>,
    pub is_cover_hidden: bool,
    pub genre: String,
    pub rating: Option<f64>,
    pub release_year: Option<String>,
    pub body: String,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Returns the rating if it is present and a finite number.
    pub fn usable_rating(&self) -> Option<f64> {
        self.rating.filter(|r| r.is_finite())
    }
}

/// Every review of the same artist and album folded into one card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAlbum {
    /// Id of the most recently created member review.
    pub id: i64,
    pub artist_name: String,
    pub album_name: String,
    pub cover_image_url: Option<String>,
    pub is_cover_hidden: bool,
    pub genre: String,
    pub release_year: Option<String>,
    /// Arithmetic mean of the member ratings, not rounded.
    pub rating: f64,
    pub review_count: usize,
    pub created_at: DateTime<Utc>,
    /// Member reviews in input order.
    pub reviews: Vec<Review>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewReview {
    pub artist_name: String,
    pub album_name: String,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_cover_hidden: bool,
    pub genre: String,
    pub rating: f64,
    #[serde(default)]
    pub release_year: Option<String>,
    #[serde(default)]
    pub body: String,
}

fn validate_rating(rating: f64) -> Result<()> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        bail!(
            "Rating must be a number between {} and {}, got {}",
            MIN_RATING,
            MAX_RATING,
            rating
        );
    }
    Ok(())
}

impl NewReview {
    pub fn validate(&self) -> Result<()> {
        if self.artist_name.trim().is_empty() {
            bail!("Artist name cannot be empty");
        }
        if self.album_name.trim().is_empty() {
            bail!("Album name cannot be empty");
        }
        validate_rating(self.rating)
    }
}

/// Partial update of a review, absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_cover_hidden: Option<bool>,
    pub genre: Option<String>,
    pub rating: Option<f64>,
    pub release_year: Option<String>,
    pub body: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(artist_name) = &self.artist_name {
            if artist_name.trim().is_empty() {
                bail!("Artist name cannot be empty");
            }
        }
        if let Some(album_name) = &self.album_name {
            if album_name.trim().is_empty() {
                bail!("Album name cannot be empty");
            }
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_review(rating: f64) -> NewReview {
        NewReview {
            artist_name: "Radiohead".to_string(),
            album_name: "OK Computer".to_string(),
            cover_image_url: None,
            is_cover_hidden: false,
            genre: "Rock".to_string(),
            rating,
            release_year: Some("1997".to_string()),
            body: String::new(),
        }
    }

    #[test]
    fn accepts_ratings_within_bounds() {
        assert!(new_review(0.0).validate().is_ok());
        assert!(new_review(7.5).validate().is_ok());
        assert!(new_review(10.0).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_or_nan_ratings() {
        assert!(new_review(-0.5).validate().is_err());
        assert!(new_review(10.1).validate().is_err());
        assert!(new_review(f64::NAN).validate().is_err());
    }

    #[test]
    fn rejects_blank_names() {
        let mut review = new_review(5.0);
        review.artist_name = "   ".to_string();
        assert!(review.validate().is_err());

        let update = ReviewUpdate {
            album_name: Some("".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn usable_rating_filters_non_finite() {
        let mut review = Review {
            id: 1,
            user_id: 1,
            artist_name: "a".to_string(),
            album_name: "b".to_string(),
            cover_image_url: None,
            is_cover_hidden: false,
            genre: "g".to_string(),
            rating: Some(f64::INFINITY),
            release_year: None,
            body: String::new(),
            likes_count: 0,
            created_at: Utc::now(),
        };
        assert_eq!(review.usable_rating(), None);
        review.rating = Some(4.0);
        assert_eq!(review.usable_rating(), Some(4.0));
    }
}
