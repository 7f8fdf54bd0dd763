//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, clock, offsets), update only
//! this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Regular test user handle
pub const TEST_USER: &str = "testuser";

/// Regular test user password
pub const TEST_PASS: &str = "testpass123";

/// Second regular user, for ownership checks
pub const OTHER_USER: &str = "otheruser";

/// Second regular user password
pub const OTHER_PASS: &str = "otherpass123";

/// Admin test user handle
pub const ADMIN_USER: &str = "admin";

/// Admin test user password
pub const ADMIN_PASS: &str = "adminpass123";

// ============================================================================
// Time
// ============================================================================

/// Instant the test server's clock starts at
pub const TEST_NOW: &str = "2026-03-10T12:00:00Z";

/// Local time of the test community (UTC+9)
pub const TEST_UTC_OFFSET_MINUTES: i32 = 9 * 60;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
