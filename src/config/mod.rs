//! Configuration Management
//!
//! Layered configuration loading from files and environment variables.

mod settings;

pub use settings::{
    DatabaseSettings, JwtSettings, PushSettings, ServerSettings, Settings, SnowflakeSettings,
    WebSocketSettings,
};
