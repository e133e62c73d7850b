//! WebSocket Realtime Core
//!
//! Connection admission, room membership and presence registries, ordered
//! message dispatch, read-receipt tracking, and typing fan-out.

pub mod dispatcher;
pub mod events;
pub mod handler;
pub mod hub;
pub mod presence;
pub mod receipts;
pub mod rooms;
pub mod session;
pub mod typing;

pub use dispatcher::MessageDispatcher;
pub use events::{ClientEvent, MessageView, ServerEvent};
pub use handler::{admit_session, teardown_session, ws_handler};
pub use hub::RoomHub;
pub use presence::PresenceRegistry;
pub use receipts::ReadReceiptTracker;
pub use rooms::RoomService;
pub use session::{ConnectedSession, SessionId};
pub use typing::TypingNotifier;
