//! Repository Implementations
//!
//! PostgreSQL-backed implementations of the domain collaborator traits.

mod message_store;
mod read_receipt_store;
mod room_directory;
mod user_directory;

pub use message_store::PgMessageStore;
pub use read_receipt_store::PgReadReceiptStore;
pub use room_directory::PgRoomDirectory;
pub use user_directory::PgUserDirectory;
