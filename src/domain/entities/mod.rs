//! # Domain Entities
//!
//! Core domain entities representing the main business objects in the
//! support-chat backend. Persistent entities map directly to their
//! corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: A client, technician, or admin identity
//! - **Room**: A fixed client-technician-task conversation channel
//! - **Message**: A text or file message sent in a room
//! - **ReadReceipt**: A record that a user has seen a message
//!
//! ## Collaborator Traits
//!
//! The realtime core touches the outside world only through these traits,
//! implemented in the infrastructure layer:
//!
//! - `IdentityResolver` resolves a credential token to an active user
//! - `PresenceStore` refreshes the durable online/last-seen cache
//! - `RoomDirectory` answers room membership questions
//! - `MessageStore` appends and fetches messages, flips read flags
//! - `ReadReceiptStore` records receipts idempotently
//! - `NotificationSink` accepts best-effort push hand-offs

mod message;
mod notification;
mod read_receipt;
mod room;
mod user;

pub use user::{IdentityResolver, PresenceStore, User, UserRole};

pub use room::{Room, RoomDirectory};

pub use message::{Message, MessageKind, MessageStore, NewMessage, QuoteView};

pub use read_receipt::{ReadReceipt, ReadReceiptStore};

pub use notification::{NotificationPayload, NotificationSink};
