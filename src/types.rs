//! Core types for dynamic node configuration management.

/// ConfigUid: Unique identifier of one remotely assigned configuration version
pub type ConfigUid = String;

/// Timestamp: UTC instant used for pointer modification times
pub type Timestamp = chrono::DateTime<chrono::Utc>;
