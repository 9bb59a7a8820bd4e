//! Confsync: Dynamic Node Configuration Management
//!
//! Resolves and maintains the active configuration for a long-running node
//! agent in a managed cluster. Configuration comes from local defaults, an
//! optional config file, or a remotely assigned, checkpointed configuration
//! with trial-period promotion and last-known-good rollback.

pub mod checkpoint;
pub mod cluster;
pub mod concurrency;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod status;
pub mod types;
