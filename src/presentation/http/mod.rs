//! HTTP Surface
//!
//! Route configuration and request handlers. The REST CRUD surface for
//! users, tasks, and reporting lives in a separate service; this crate only
//! exposes the realtime gateway plus operational endpoints.

pub mod handlers;
pub mod routes;
