use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: i64,
    pub title: String,
    pub body: String,
    /// Zero-based display position.
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewNotice {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl NewNotice {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("Notice title cannot be empty");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NoticeUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub user_id: usize,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewComment {
    pub body: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<()> {
        if self.body.trim().is_empty() {
            bail!("Comment cannot be empty");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: usize,
    pub nickname: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProfileUpdate {
    pub nickname: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.nickname.trim().is_empty() {
            bail!("Nickname cannot be empty");
        }
        Ok(())
    }
}

/// Like state of a review after a like or unlike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: i64,
}
