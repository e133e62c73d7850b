//! Shared Utilities
//!
//! Common types used across all layers: errors, ID generation, validation.

pub mod error;
pub mod snowflake;
pub mod validation;

pub use error::AppError;
pub use snowflake::SnowflakeGenerator;
