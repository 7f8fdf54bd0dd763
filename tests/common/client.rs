//! HTTP client for end-to-end tests
//!
//! Wraps reqwest and provides methods for the Ditchfork endpoints.
//! When API routes or request formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    /// Creates a client pre-authenticated as the regular test user
    pub async fn authenticated(base_url: String) -> Self {
        Self::authenticated_as(base_url, TEST_USER, TEST_PASS).await
    }

    /// Creates a client pre-authenticated as the second regular user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated_as(base_url, OTHER_USER, OTHER_PASS).await
    }

    /// Creates a client pre-authenticated as an admin user
    pub async fn authenticated_admin(base_url: String) -> Self {
        Self::authenticated_as(base_url, ADMIN_USER, ADMIN_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/login
    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            &json!({ "user_handle": handle, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    /// GET /
    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    /// GET /v1/reviews
    pub async fn list_reviews(&self) -> Response {
        self.get("/v1/reviews").await
    }

    /// GET /v1/reviews?author={user_id}
    pub async fn list_reviews_by(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/reviews?author={}", user_id)).await
    }

    /// GET /v1/reviews/albums
    pub async fn list_albums(&self) -> Response {
        self.get("/v1/reviews/albums").await
    }

    /// GET /v1/reviews/albums?strict=true
    pub async fn list_albums_strict(&self) -> Response {
        self.get("/v1/reviews/albums?strict=true").await
    }

    /// POST /v1/reviews
    pub async fn create_review(&self, artist: &str, album: &str, rating: f64) -> Response {
        self.post_json(
            "/v1/reviews",
            &json!({
                "artist_name": artist,
                "album_name": album,
                "genre": "rock",
                "rating": rating,
                "body": format!("Thoughts about {}", album),
            }),
        )
        .await
    }

    /// GET /v1/reviews/{id}
    pub async fn get_review(&self, id: i64) -> Response {
        self.get(&format!("/v1/reviews/{}", id)).await
    }

    /// PUT /v1/reviews/{id}
    pub async fn update_review(&self, id: i64, update: Value) -> Response {
        self.put_json(&format!("/v1/reviews/{}", id), &update).await
    }

    /// DELETE /v1/reviews/{id}
    pub async fn delete_review(&self, id: i64) -> Response {
        self.delete(&format!("/v1/reviews/{}", id)).await
    }

    /// POST /v1/reviews/{id}/like
    pub async fn like_review(&self, id: i64) -> Response {
        self.post_json(&format!("/v1/reviews/{}/like", id), &json!({}))
            .await
    }

    /// DELETE /v1/reviews/{id}/like
    pub async fn unlike_review(&self, id: i64) -> Response {
        self.delete(&format!("/v1/reviews/{}/like", id)).await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// GET /v1/reviews/{id}/comments
    pub async fn list_comments(&self, review_id: i64) -> Response {
        self.get(&format!("/v1/reviews/{}/comments", review_id))
            .await
    }

    /// POST /v1/reviews/{id}/comments
    pub async fn add_comment(&self, review_id: i64, body: &str) -> Response {
        self.post_json(
            &format!("/v1/reviews/{}/comments", review_id),
            &json!({ "body": body }),
        )
        .await
    }

    /// DELETE /v1/comments/{id}
    pub async fn delete_comment(&self, id: i64) -> Response {
        self.delete(&format!("/v1/comments/{}", id)).await
    }

    // ========================================================================
    // Festivals
    // ========================================================================

    /// GET /v1/festivals?tab={tab}
    pub async fn list_festivals(&self, tab: Option<&str>) -> Response {
        match tab {
            Some(tab) => self.get(&format!("/v1/festivals?tab={}", tab)).await,
            None => self.get("/v1/festivals").await,
        }
    }

    /// GET /v1/festivals/{id}
    pub async fn get_festival(&self, id: i64) -> Response {
        self.get(&format!("/v1/festivals/{}", id)).await
    }

    /// POST /v1/festivals
    pub async fn create_festival(&self, festival: Value) -> Response {
        self.post_json("/v1/festivals", &festival).await
    }

    /// PUT /v1/festivals/{id}
    pub async fn update_festival(&self, id: i64, festival: Value) -> Response {
        self.put_json(&format!("/v1/festivals/{}", id), &festival)
            .await
    }

    /// DELETE /v1/festivals/{id}
    pub async fn delete_festival(&self, id: i64) -> Response {
        self.delete(&format!("/v1/festivals/{}", id)).await
    }

    // ========================================================================
    // Notices
    // ========================================================================

    /// GET /v1/notices
    pub async fn list_notices(&self) -> Response {
        self.get("/v1/notices").await
    }

    /// GET /v1/notices/{id}
    pub async fn get_notice(&self, id: i64) -> Response {
        self.get(&format!("/v1/notices/{}", id)).await
    }

    /// POST /v1/notices
    pub async fn create_notice(&self, title: &str) -> Response {
        self.post_json(
            "/v1/notices",
            &json!({ "title": title, "body": format!("{} details", title) }),
        )
        .await
    }

    /// PUT /v1/notices/{id}
    pub async fn update_notice(&self, id: i64, update: Value) -> Response {
        self.put_json(&format!("/v1/notices/{}", id), &update).await
    }

    /// DELETE /v1/notices/{id}
    pub async fn delete_notice(&self, id: i64) -> Response {
        self.delete(&format!("/v1/notices/{}", id)).await
    }

    /// PUT /v1/notices/order
    pub async fn reorder_notices(&self, ids: &[i64]) -> Response {
        self.put_json("/v1/notices/order", &json!({ "ids": ids }))
            .await
    }

    /// POST /v1/notices/{id}/move
    pub async fn move_notice(&self, id: i64, position: usize) -> Response {
        self.post_json(
            &format!("/v1/notices/{}/move", id),
            &json!({ "position": position }),
        )
        .await
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    /// GET /v1/profiles/{user_id}
    pub async fn get_profile(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/profiles/{}", user_id)).await
    }

    /// PUT /v1/profile
    pub async fn update_profile(&self, profile: Value) -> Response {
        self.put_json("/v1/profile", &profile).await
    }
}
