/// Session/user key that scopes job queues and caches.
pub type Owner = String;

/// Globally unique job identifier (UUID v4 rendered as a string).
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
