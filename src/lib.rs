//! # Support Chat Server
//!
//! This crate provides a real-time support-chat backend with:
//! - WebSocket sessions for clients and technicians in task-scoped rooms
//! - Ordered message dispatch with quoted-message validation
//! - Multi-device presence tracking and read-receipt aggregation
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core entities and collaborator traits
//! - **Infrastructure Layer**: Database, push, and metrics implementations
//! - **Presentation Layer**: HTTP routes and the WebSocket realtime core
//!
//! ## Module Structure
//!
//! ```text
//! support_chat_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and collaborator traits
//! +-- infrastructure/ Database, push, and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket realtime core
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
