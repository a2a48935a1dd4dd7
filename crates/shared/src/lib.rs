//! Shared types, envelopes, and configuration for Trestle.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - The `{success, data | error}` result envelope
//! - Configuration management, including the EVM policy constants

pub mod config;
pub mod envelope;
pub mod types;

pub use config::{AppConfig, EvmPolicy, ResilienceConfig};
pub use envelope::{Envelope, ErrorBody};
