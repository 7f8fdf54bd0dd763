//! Test fixtures: user database and raw community rows
//!
//! Raw rows go straight through rusqlite so tests can store records the
//! API would refuse (missing ratings, broken dates).

use super::constants::*;
use anyhow::Result;
use ditchfork_server::user::{
    PasswordCredentials, SqliteUserStore, UserAuthCredentialsStore, UserRole, UserStore,
};
use rusqlite::{params, types::Value, Connection};
use std::path::Path;

/// Ids of the users created by [`create_test_users`].
pub struct TestUsers {
    pub test_user_id: usize,
    pub other_user_id: usize,
    pub admin_user_id: usize,
}

/// Creates the regular, other and admin test users in `user.db`.
pub fn create_test_users(db_path: &Path) -> Result<TestUsers> {
    let store = SqliteUserStore::new(db_path)?;

    let test_user_id = create_user_with_password(&store, TEST_USER, TEST_PASS, None)?;
    let other_user_id = create_user_with_password(&store, OTHER_USER, OTHER_PASS, None)?;
    let admin_user_id =
        create_user_with_password(&store, ADMIN_USER, ADMIN_PASS, Some(UserRole::Admin))?;

    Ok(TestUsers {
        test_user_id,
        other_user_id,
        admin_user_id,
    })
}

pub fn create_user_with_password(
    store: &SqliteUserStore,
    handle: &str,
    password: &str,
    role: Option<UserRole>,
) -> Result<usize> {
    let user_id = store.create_user(handle)?;
    if let Some(role) = role {
        store.add_user_role(user_id, role)?;
    }
    let credentials = PasswordCredentials::create(user_id, password)?;
    store.set_password_credentials(&credentials)?;
    Ok(user_id)
}

/// Rating value as it may sit in a hand-edited database.
#[allow(dead_code)]
pub enum RawRating {
    Number(f64),
    Text(&'static str),
    Null,
}

impl RawRating {
    fn to_value(&self) -> Value {
        match self {
            RawRating::Number(n) => Value::Real(*n),
            RawRating::Text(s) => Value::Text(s.to_string()),
            RawRating::Null => Value::Null,
        }
    }
}

/// Inserts a review row with an explicit `created_at`, returns its id.
#[allow(dead_code)]
pub fn insert_raw_review(
    community_db: &Path,
    user_id: usize,
    artist_name: &str,
    album_name: &str,
    rating: RawRating,
    created_at: &str,
) -> Result<i64> {
    let conn = Connection::open(community_db)?;
    conn.execute(
        "INSERT INTO reviews (user_id, artist_name, album_name, cover_image_url, \
         is_cover_hidden, genre, rating, release_year, body, created_at) \
         VALUES (?1, ?2, ?3, NULL, 0, 'rock', ?4, NULL, '', ?5)",
        params![
            user_id as i64,
            artist_name,
            album_name,
            rating.to_value(),
            created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a festival row without any validation, returns its id.
#[allow(dead_code)]
pub fn insert_raw_festival(
    community_db: &Path,
    name: &str,
    start_date: &str,
    end_date: Option<&str>,
    kind: &str,
) -> Result<i64> {
    let conn = Connection::open(community_db)?;
    conn.execute(
        "INSERT INTO festivals (name, location, start_date, end_date, type, created_at) \
         VALUES (?1, 'Seoul', ?2, ?3, ?4, ?5)",
        params![name, start_date, end_date, kind, TEST_NOW],
    )?;
    Ok(conn.last_insert_rowid())
}
