//! # Domain Layer
//!
//! The domain layer contains the core business objects of the support-chat
//! backend. It is independent of any external frameworks or infrastructure
//! concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, Room, Message, ReadReceipt) and
//!   the collaborator traits the realtime core consumes (identity resolution,
//!   room authorization, message storage, read-receipt storage, notification
//!   hand-off). Traits are implemented in the infrastructure layer, following
//!   the dependency inversion principle.

pub mod entities;

pub use entities::*;
