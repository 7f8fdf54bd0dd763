use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials, PasswordHasherKind};
use super::permissions::UserRole;
use super::user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};

const USER_ROLE_TABLE_V_0: Table = Table {
    name: "user_role",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("role", &SqlType::Text, non_null = true),
    ],
    unique_constraints: &[&["user_id", "role"]],
    indices: &[],
};

const USER_PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            is_primary_key = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[],
    indices: &[],
};

const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_ROLE_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
    ],
    migration: None,
}];

fn to_unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_seconds(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, USER_VERSIONED_SCHEMAS)
            .context("Failed to open user database")?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_auth_token(row: &Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get("user_id")?,
            value: AuthTokenValue(row.get("value")?),
            created: from_unix_seconds(row.get("created")?),
            last_used: row
                .get::<_, Option<i64>>("last_used")?
                .map(from_unix_seconds),
        })
    }

    fn row_to_password_credentials(row: &Row) -> rusqlite::Result<PasswordCredentials> {
        let hasher_str: String = row.get("hasher")?;
        let hasher = PasswordHasherKind::from_str(&hasher_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;
        Ok(PasswordCredentials {
            user_id: row.get("user_id")?,
            salt: row.get("salt")?,
            hash: row.get("hash")?,
            hasher,
            created: from_unix_seconds(row.get("created")?),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO user (handle) VALUES (?1)", params![user_handle])
            .with_context(|| format!("Failed to create user {}", user_handle))?;
        let user_id = conn.last_insert_rowid() as usize;
        info!("Created user {} with id {}", user_handle, user_id);
        Ok(user_id)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT handle FROM user ORDER BY id")?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(handles)
    }

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT role FROM user_role WHERE user_id = ?1")?;
        let names = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names
            .iter()
            .filter_map(|name| match name.parse() {
                Ok(role) => Some(role),
                Err(_) => {
                    warn!("Ignoring unknown role {:?} of user {}", name, user_id);
                    None
                }
            })
            .collect())
    }

    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO user_role (user_id, role) VALUES (?1, ?2)",
            params![user_id, role.as_str()],
        )
        .with_context(|| format!("Failed to add role {} to user {}", role, user_id))?;
        Ok(())
    }

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM user_role WHERE user_id = ?1 AND role = ?2",
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_password_credentials(&self, user_id: usize) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, salt, hash, hasher, created FROM user_password_credentials
                 WHERE user_id = ?1",
                params![user_id],
                Self::row_to_password_credentials,
            )
            .optional()?)
    }

    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                salt = excluded.salt,
                hash = excluded.hash,
                hasher = excluded.hasher,
                created = excluded.created",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                to_unix_seconds(credentials.created)
            ],
        )?;
        if updated == 0 {
            bail!("No credentials written for user {}", credentials.user_id);
        }
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
                params![value.0],
                Self::row_to_auth_token,
            )
            .optional()?)
    }

    fn add_auth_token(&self, token: &AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id,
                token.value.0,
                to_unix_seconds(token.created),
                token.last_used.map(to_unix_seconds)
            ],
        )?;
        Ok(())
    }

    fn delete_auth_token(&self, user_id: usize, value: &AuthTokenValue) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE value = ?1 AND user_id = ?2",
            params![value.0, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn update_auth_token_last_used(&self, value: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![to_unix_seconds(SystemTime::now()), value.0],
        )?;
        Ok(())
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = to_unix_seconds(SystemTime::now()) - (unused_for_days * 24 * 60 * 60) as i64;
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM auth_token WHERE COALESCE(last_used, created) < ?1",
            params![cutoff],
        )?;
        debug!("Pruned {} auth tokens unused since {}", deleted, cutoff);
        Ok(deleted)
    }
}
