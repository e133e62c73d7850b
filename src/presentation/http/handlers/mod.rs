//! HTTP Request Handlers

pub mod health;
