//! Errors raised when a stored record cannot be used by the review
//! aggregation or the festival classification.

use thiserror::Error;

/// A malformed or missing required field in an input record.
///
/// The core never recovers from these on its own: callers decide whether
/// to skip the record or to fail the whole request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("Review {review_id} has a missing or non-numeric rating")]
    MissingRating { review_id: i64 },

    #[error("Festival {festival_id} has an unparseable start_date {value:?}")]
    InvalidStartDate { festival_id: i64, value: String },

    #[error("Festival {festival_id} has an unparseable end_date {value:?}")]
    InvalidEndDate { festival_id: i64, value: String },

    #[error("Festival {festival_id} is neither a school nor an external festival")]
    UnknownFestivalType { festival_id: i64 },
}

impl DataError {
    /// Short label used for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DataError::MissingRating { .. } => "missing_rating",
            DataError::InvalidStartDate { .. } => "invalid_start_date",
            DataError::InvalidEndDate { .. } => "invalid_end_date",
            DataError::UnknownFestivalType { .. } => "unknown_festival_type",
        }
    }
}
