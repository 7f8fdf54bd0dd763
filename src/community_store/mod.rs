mod models;
mod ordered_index;
mod schema;
mod sqlite_community_store;

pub use models::*;
pub use ordered_index::OrderedIndex;
pub use schema::COMMUNITY_VERSIONED_SCHEMAS;
pub use sqlite_community_store::SqliteCommunityStore;

use crate::festivals::{Festival, NewFestival};
use crate::reviews::{NewReview, Review, ReviewUpdate};
use anyhow::Result;

pub trait ReviewStore: Send + Sync {
    fn insert_review(&self, user_id: usize, review: &NewReview) -> Result<Review>;
    fn get_review(&self, id: i64) -> Result<Option<Review>>;
    /// Most recent first. Restricted to one author when `author` is set.
    fn list_reviews(&self, author: Option<usize>) -> Result<Vec<Review>>;
    fn update_review(&self, id: i64, update: &ReviewUpdate) -> Result<Option<Review>>;
    fn delete_review(&self, id: i64) -> Result<bool>;

    /// Records a like of `user_id` and bumps the counter in one transaction.
    /// Liking twice leaves the counter unchanged. `None` if the review does
    /// not exist.
    fn like_review(&self, review_id: i64, user_id: usize) -> Result<Option<LikeState>>;
    fn unlike_review(&self, review_id: i64, user_id: usize) -> Result<Option<LikeState>>;
    fn has_liked(&self, review_id: i64, user_id: usize) -> Result<bool>;
}

pub trait FestivalStore: Send + Sync {
    fn insert_festival(&self, festival: &NewFestival) -> Result<Festival>;
    fn get_festival(&self, id: i64) -> Result<Option<Festival>>;
    /// Ordered by stored start date, then id.
    fn list_festivals(&self) -> Result<Vec<Festival>>;
    fn update_festival(&self, id: i64, festival: &NewFestival) -> Result<Option<Festival>>;
    fn delete_festival(&self, id: i64) -> Result<bool>;
}

pub trait NoticeStore: Send + Sync {
    /// Appends the notice after the existing ones.
    fn insert_notice(&self, notice: &NewNotice) -> Result<Notice>;
    fn get_notice(&self, id: i64) -> Result<Option<Notice>>;
    fn list_notices(&self) -> Result<Vec<Notice>>;
    fn update_notice(&self, id: i64, update: &NoticeUpdate) -> Result<Option<Notice>>;
    /// Deletes the notice and closes the gap in positions.
    fn delete_notice(&self, id: i64) -> Result<bool>;

    /// Rewrites every position from `ordered_ids`. Returns false, writing
    /// nothing, if the ids are not exactly the stored ones.
    fn replace_notice_order(&self, ordered_ids: &[i64]) -> Result<bool>;
    /// Returns false if the notice does not exist.
    fn move_notice(&self, id: i64, position: usize) -> Result<bool>;
}

pub trait CommentStore: Send + Sync {
    /// `None` if the review does not exist.
    fn add_comment(&self, review_id: i64, user_id: usize, comment: &NewComment)
        -> Result<Option<Comment>>;
    fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    /// Oldest first.
    fn list_comments(&self, review_id: i64) -> Result<Vec<Comment>>;
    fn delete_comment(&self, id: i64) -> Result<bool>;
}

pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, user_id: usize) -> Result<Option<Profile>>;
    fn upsert_profile(&self, user_id: usize, profile: &ProfileUpdate) -> Result<Profile>;
}

pub trait CommunityStore:
    ReviewStore + FestivalStore + NoticeStore + CommentStore + ProfileStore
{
}

impl<T> CommunityStore for T where
    T: ReviewStore + FestivalStore + NoticeStore + CommentStore + ProfileStore
{
}
