use super::schema::COMMUNITY_VERSIONED_SCHEMAS;
use super::*;
use crate::festivals::{Festival, FestivalKind, NewFestival};
use crate::reviews::{NewReview, Review, ReviewUpdate};
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{
    params,
    types::{Type, Value},
    Connection, OptionalExtension, Row,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const REVIEW_COLUMNS: &str = "id, user_id, artist_name, album_name, cover_image_url, \
    is_cover_hidden, genre, rating, release_year, body, likes_count, created_at";

const FESTIVAL_COLUMNS: &str =
    "id, name, location, start_date, end_date, type, description, poster_url, ticket_url, created_at";

const NOTICE_COLUMNS: &str = "id, title, body, position, created_at";

const COMMENT_COLUMNS: &str = "id, review_id, user_id, body, created_at";

#[derive(Clone)]
pub struct SqliteCommunityStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCommunityStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, COMMUNITY_VERSIONED_SCHEMAS)
            .context("Failed to open community database")?;
        Ok(SqliteCommunityStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn datetime_column(row: &Row, name: &str) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(name)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                let index = row.as_ref().column_index(name).unwrap_or_default();
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
            })
    }

    /// Ratings are read leniently so that a malformed row surfaces as a
    /// missing rating rather than failing the whole query.
    fn rating_from_value(value: Value) -> Option<f64> {
        match value {
            Value::Real(rating) => Some(rating),
            Value::Integer(rating) => Some(rating as f64),
            Value::Text(raw) => raw.trim().parse().ok(),
            Value::Null | Value::Blob(_) => None,
        }
    }

    fn row_to_review(row: &Row) -> rusqlite::Result<Review> {
        Ok(Review {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            artist_name: row.get("artist_name")?,
            album_name: row.get("album_name")?,
            cover_image_url: row.get("cover_image_url")?,
            is_cover_hidden: row.get("is_cover_hidden")?,
            genre: row.get("genre")?,
            rating: Self::rating_from_value(row.get("rating")?),
            release_year: row.get("release_year")?,
            body: row.get("body")?,
            likes_count: row.get("likes_count")?,
            created_at: Self::datetime_column(row, "created_at")?,
        })
    }

    fn row_to_festival(row: &Row) -> rusqlite::Result<Festival> {
        let id: i64 = row.get("id")?;
        let kind_str: String = row.get("type")?;
        let kind = FestivalKind::parse(&kind_str);
        if kind.is_none() {
            warn!("Festival {} has unknown type {:?}", id, kind_str);
        }
        Ok(Festival {
            id,
            name: row.get("name")?,
            location: row.get("location")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            kind,
            description: row.get("description")?,
            poster_url: row.get("poster_url")?,
            ticket_url: row.get("ticket_url")?,
            created_at: Self::datetime_column(row, "created_at")?,
        })
    }

    fn row_to_notice(row: &Row) -> rusqlite::Result<Notice> {
        Ok(Notice {
            id: row.get("id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            position: row.get("position")?,
            created_at: Self::datetime_column(row, "created_at")?,
        })
    }

    fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
        Ok(Comment {
            id: row.get("id")?,
            review_id: row.get("review_id")?,
            user_id: row.get("user_id")?,
            body: row.get("body")?,
            created_at: Self::datetime_column(row, "created_at")?,
        })
    }

    fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
        Ok(Profile {
            user_id: row.get("user_id")?,
            nickname: row.get("nickname")?,
            bio: row.get("bio")?,
            avatar_url: row.get("avatar_url")?,
            updated_at: Self::datetime_column(row, "updated_at")?,
        })
    }

    fn query_review(conn: &Connection, id: i64) -> Result<Option<Review>> {
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS),
                params![id],
                Self::row_to_review,
            )
            .optional()?)
    }

    fn query_festival(conn: &Connection, id: i64) -> Result<Option<Festival>> {
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM festivals WHERE id = ?1", FESTIVAL_COLUMNS),
                params![id],
                Self::row_to_festival,
            )
            .optional()?)
    }

    fn query_notice(conn: &Connection, id: i64) -> Result<Option<Notice>> {
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM notices WHERE id = ?1", NOTICE_COLUMNS),
                params![id],
                Self::row_to_notice,
            )
            .optional()?)
    }

    fn notice_index(conn: &Connection) -> Result<OrderedIndex> {
        let mut stmt = conn.prepare("SELECT id FROM notices ORDER BY position ASC, id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(OrderedIndex::new(ids))
    }

    /// Persists every position of `index`. Runs inside the caller's
    /// transaction.
    fn write_notice_order(conn: &Connection, index: &OrderedIndex) -> Result<()> {
        let mut stmt = conn.prepare("UPDATE notices SET position = ?1 WHERE id = ?2")?;
        for (position, id) in index.ids().iter().enumerate() {
            stmt.execute(params![position as i64, id])?;
        }
        Ok(())
    }

    fn likes_count(conn: &Connection, review_id: i64) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT likes_count FROM reviews WHERE id = ?1",
            params![review_id],
            |row| row.get(0),
        )?)
    }

    fn review_exists(conn: &Connection, review_id: i64) -> Result<bool> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM reviews WHERE id = ?1",
                params![review_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

impl ReviewStore for SqliteCommunityStore {
    fn insert_review(&self, user_id: usize, review: &NewReview) -> Result<Review> {
        let conn = self.conn.lock().unwrap();
        let now = Self::format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO reviews (user_id, artist_name, album_name, cover_image_url,
                is_cover_hidden, genre, rating, release_year, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user_id,
                review.artist_name.trim(),
                review.album_name.trim(),
                review.cover_image_url,
                review.is_cover_hidden,
                review.genre,
                review.rating,
                review.release_year,
                review.body,
                now
            ],
        )
        .context("Failed to insert review")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted review {} by user {}", id, user_id);
        Self::query_review(&conn, id)?.context("Inserted review not found")
    }

    fn get_review(&self, id: i64) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        Self::query_review(&conn, id)
    }

    fn list_reviews(&self, author: Option<usize>) -> Result<Vec<Review>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM reviews WHERE (?1 IS NULL OR user_id = ?1)
             ORDER BY created_at DESC, id DESC",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![author], Self::row_to_review)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reviews)
    }

    fn update_review(&self, id: i64, update: &ReviewUpdate) -> Result<Option<Review>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE reviews SET
                artist_name = COALESCE(?1, artist_name),
                album_name = COALESCE(?2, album_name),
                cover_image_url = COALESCE(?3, cover_image_url),
                is_cover_hidden = COALESCE(?4, is_cover_hidden),
                genre = COALESCE(?5, genre),
                rating = COALESCE(?6, rating),
                release_year = COALESCE(?7, release_year),
                body = COALESCE(?8, body)
             WHERE id = ?9",
            params![
                update.artist_name.as_deref().map(str::trim),
                update.album_name.as_deref().map(str::trim),
                update.cover_image_url,
                update.is_cover_hidden,
                update.genre,
                update.rating,
                update.release_year,
                update.body,
                id
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::query_review(&conn, id)
    }

    fn delete_review(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn like_review(&self, review_id: i64, user_id: usize) -> Result<Option<LikeState>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !Self::review_exists(&tx, review_id)? {
            return Ok(None);
        }
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO review_likes (review_id, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![review_id, user_id, Self::format_datetime(&Utc::now())],
        )?;
        if inserted == 1 {
            tx.execute(
                "UPDATE reviews SET likes_count = likes_count + 1 WHERE id = ?1",
                params![review_id],
            )?;
        }
        let likes_count = Self::likes_count(&tx, review_id)?;
        tx.commit()?;
        Ok(Some(LikeState {
            liked: true,
            likes_count,
        }))
    }

    fn unlike_review(&self, review_id: i64, user_id: usize) -> Result<Option<LikeState>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !Self::review_exists(&tx, review_id)? {
            return Ok(None);
        }
        let removed = tx.execute(
            "DELETE FROM review_likes WHERE review_id = ?1 AND user_id = ?2",
            params![review_id, user_id],
        )?;
        if removed == 1 {
            tx.execute(
                "UPDATE reviews SET likes_count = likes_count - 1 WHERE id = ?1 AND likes_count > 0",
                params![review_id],
            )?;
        }
        let likes_count = Self::likes_count(&tx, review_id)?;
        tx.commit()?;
        Ok(Some(LikeState {
            liked: false,
            likes_count,
        }))
    }

    fn has_liked(&self, review_id: i64, user_id: usize) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT 1 FROM review_likes WHERE review_id = ?1 AND user_id = ?2",
                params![review_id, user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

impl FestivalStore for SqliteCommunityStore {
    fn insert_festival(&self, festival: &NewFestival) -> Result<Festival> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO festivals (name, location, start_date, end_date, type,
                description, poster_url, ticket_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                festival.name,
                festival.location,
                festival.start_date,
                festival.end_date,
                festival.kind.as_str(),
                festival.description,
                festival.poster_url,
                festival.ticket_url,
                Self::format_datetime(&Utc::now())
            ],
        )
        .context("Failed to insert festival")?;
        let id = conn.last_insert_rowid();
        Self::query_festival(&conn, id)?.context("Inserted festival not found")
    }

    fn get_festival(&self, id: i64) -> Result<Option<Festival>> {
        let conn = self.conn.lock().unwrap();
        Self::query_festival(&conn, id)
    }

    fn list_festivals(&self) -> Result<Vec<Festival>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM festivals ORDER BY start_date ASC, id ASC",
            FESTIVAL_COLUMNS
        ))?;
        let festivals = stmt
            .query_map([], Self::row_to_festival)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(festivals)
    }

    fn update_festival(&self, id: i64, festival: &NewFestival) -> Result<Option<Festival>> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE festivals SET name = ?1, location = ?2, start_date = ?3, end_date = ?4,
                type = ?5, description = ?6, poster_url = ?7, ticket_url = ?8
             WHERE id = ?9",
            params![
                festival.name,
                festival.location,
                festival.start_date,
                festival.end_date,
                festival.kind.as_str(),
                festival.description,
                festival.poster_url,
                festival.ticket_url,
                id
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::query_festival(&conn, id)
    }

    fn delete_festival(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute("DELETE FROM festivals WHERE id = ?1", params![id])? > 0)
    }
}

impl NoticeStore for SqliteCommunityStore {
    fn insert_notice(&self, notice: &NewNotice) -> Result<Notice> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM notices",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO notices (title, body, position, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                notice.title,
                notice.body,
                next_position,
                Self::format_datetime(&Utc::now())
            ],
        )?;
        let id = tx.last_insert_rowid();
        let inserted = Self::query_notice(&tx, id)?.context("Inserted notice not found")?;
        tx.commit()?;
        Ok(inserted)
    }

    fn get_notice(&self, id: i64) -> Result<Option<Notice>> {
        let conn = self.conn.lock().unwrap();
        Self::query_notice(&conn, id)
    }

    fn list_notices(&self) -> Result<Vec<Notice>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notices ORDER BY position ASC, id ASC",
            NOTICE_COLUMNS
        ))?;
        let notices = stmt
            .query_map([], Self::row_to_notice)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notices)
    }

    fn update_notice(&self, id: i64, update: &NoticeUpdate) -> Result<Option<Notice>> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                bail!("Notice title cannot be empty");
            }
        }
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE notices SET title = COALESCE(?1, title), body = COALESCE(?2, body)
             WHERE id = ?3",
            params![update.title, update.body, id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::query_notice(&conn, id)
    }

    fn delete_notice(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM notices WHERE id = ?1", params![id])?;
        if deleted > 0 {
            let index = Self::notice_index(&tx)?;
            Self::write_notice_order(&tx, &index)?;
        }
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn replace_notice_order(&self, ordered_ids: &[i64]) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        if !Self::notice_index(&tx)?.is_permutation(ordered_ids) {
            return Ok(false);
        }
        Self::write_notice_order(&tx, &OrderedIndex::new(ordered_ids.to_vec()))?;
        tx.commit()?;
        Ok(true)
    }

    fn move_notice(&self, id: i64, position: usize) -> Result<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut index = Self::notice_index(&tx)?;
        if !index.move_to(id, position) {
            return Ok(false);
        }
        Self::write_notice_order(&tx, &index)?;
        tx.commit()?;
        Ok(true)
    }
}

impl CommentStore for SqliteCommunityStore {
    fn add_comment(
        &self,
        review_id: i64,
        user_id: usize,
        comment: &NewComment,
    ) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        if !Self::review_exists(&conn, review_id)? {
            return Ok(None);
        }
        conn.execute(
            "INSERT INTO comments (review_id, user_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                review_id,
                user_id,
                comment.body.trim(),
                Self::format_datetime(&Utc::now())
            ],
        )?;
        let id = conn.last_insert_rowid();
        let inserted = conn.query_row(
            &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
            params![id],
            Self::row_to_comment,
        )?;
        Ok(Some(inserted))
    }

    fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
                params![id],
                Self::row_to_comment,
            )
            .optional()?)
    }

    fn list_comments(&self, review_id: i64) -> Result<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comments WHERE review_id = ?1 ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        ))?;
        let comments = stmt
            .query_map(params![review_id], Self::row_to_comment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    fn delete_comment(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute("DELETE FROM comments WHERE id = ?1", params![id])? > 0)
    }
}

impl ProfileStore for SqliteCommunityStore {
    fn get_profile(&self, user_id: usize) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, nickname, bio, avatar_url, updated_at FROM profiles
                 WHERE user_id = ?1",
                params![user_id],
                Self::row_to_profile,
            )
            .optional()?)
    }

    fn upsert_profile(&self, user_id: usize, profile: &ProfileUpdate) -> Result<Profile> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO profiles (user_id, nickname, bio, avatar_url, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                nickname = excluded.nickname,
                bio = excluded.bio,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at",
            params![
                user_id,
                profile.nickname.trim(),
                profile.bio,
                profile.avatar_url,
                Self::format_datetime(&Utc::now())
            ],
        )?;
        conn.query_row(
            "SELECT user_id, nickname, bio, avatar_url, updated_at FROM profiles
             WHERE user_id = ?1",
            params![user_id],
            Self::row_to_profile,
        )
        .context("Upserted profile not found")
    }
}
