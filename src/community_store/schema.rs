//! Schema of the community database: reviews, likes, comments, festivals,
//! notices and profiles.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};
use anyhow::Result;
use rusqlite::Connection;

const REVIEW_FK: ForeignKey = ForeignKey {
    foreign_table: "reviews",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Version 0
// =============================================================================

const PROFILES_TABLE_V_0: Table = Table {
    name: "profiles",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("nickname", &SqlType::Text, non_null = true),
        sqlite_column!("bio", &SqlType::Text),
        sqlite_column!("avatar_url", &SqlType::Text),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

const REVIEWS_TABLE_V_0: Table = Table {
    name: "reviews",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text, non_null = true),
        sqlite_column!("cover_image_url", &SqlType::Text),
        sqlite_column!(
            "is_cover_hidden",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        // Nullable: rows written by older clients may lack a rating.
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("release_year", &SqlType::Text),
        sqlite_column!(
            "body",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_reviews_created_at", "created_at DESC"),
        ("idx_reviews_user_id", "user_id"),
    ],
    unique_constraints: &[],
};

const REVIEW_LIKES_TABLE_V_0: Table = Table {
    name: "review_likes",
    columns: &[
        sqlite_column!(
            "review_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&REVIEW_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["review_id", "user_id"]],
};

const COMMENTS_TABLE_V_0: Table = Table {
    name: "comments",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "review_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&REVIEW_FK)
        ),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_comments_review_id", "review_id")],
    unique_constraints: &[],
};

const FESTIVALS_TABLE_V_0: Table = Table {
    name: "festivals",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        sqlite_column!("start_date", &SqlType::Text, non_null = true),
        sqlite_column!("end_date", &SqlType::Text),
        sqlite_column!("type", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("poster_url", &SqlType::Text),
        sqlite_column!("ticket_url", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_festivals_start_date", "start_date")],
    unique_constraints: &[],
};

const NOTICES_TABLE_V_0: Table = Table {
    name: "notices",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "body",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

// =============================================================================
// Version 1 - Stored like counters and notice positions
// =============================================================================

const REVIEWS_TABLE_V_1: Table = Table {
    name: "reviews",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("album_name", &SqlType::Text, non_null = true),
        sqlite_column!("cover_image_url", &SqlType::Text),
        sqlite_column!(
            "is_cover_hidden",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Real),
        sqlite_column!("release_year", &SqlType::Text),
        sqlite_column!(
            "body",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!(
            "likes_count",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_reviews_created_at", "created_at DESC"),
        ("idx_reviews_user_id", "user_id"),
    ],
    unique_constraints: &[],
};

const NOTICES_TABLE_V_1: Table = Table {
    name: "notices",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "body",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!(
            "position",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[("idx_notices_position", "position")],
    unique_constraints: &[],
};

fn migrate_to_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "ALTER TABLE reviews ADD COLUMN likes_count INTEGER NOT NULL DEFAULT 0;
         UPDATE reviews SET likes_count =
            (SELECT COUNT(*) FROM review_likes WHERE review_likes.review_id = reviews.id);
         ALTER TABLE notices ADD COLUMN position INTEGER NOT NULL DEFAULT 0;
         UPDATE notices SET position =
            (SELECT COUNT(*) FROM notices AS earlier WHERE earlier.id < notices.id);
         CREATE INDEX idx_notices_position ON notices(position);",
    )?;
    Ok(())
}

pub const COMMUNITY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            PROFILES_TABLE_V_0,
            REVIEWS_TABLE_V_0,
            REVIEW_LIKES_TABLE_V_0,
            COMMENTS_TABLE_V_0,
            FESTIVALS_TABLE_V_0,
            NOTICES_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            PROFILES_TABLE_V_0,
            REVIEWS_TABLE_V_1,
            REVIEW_LIKES_TABLE_V_0,
            COMMENTS_TABLE_V_0,
            FESTIVALS_TABLE_V_0,
            NOTICES_TABLE_V_1,
        ],
        migration: Some(migrate_to_v1),
    },
];
