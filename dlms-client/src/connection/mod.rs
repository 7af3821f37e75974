//! Session management module

pub mod builder;
pub mod config;
pub mod connection;
pub mod session;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use connection::{MessageProducer, SessionState};
pub use session::{SerialSession, Session};
