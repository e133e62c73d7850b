//! # Infrastructure Layer
//!
//! Implementations of the domain's collaborator traits against PostgreSQL,
//! the push delivery service, and process metrics.

pub mod database;
pub mod metrics;
pub mod push;
pub mod repositories;
