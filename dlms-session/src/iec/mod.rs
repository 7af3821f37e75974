//! IEC 62056-21 baud rate negotiation

pub mod baud;
pub mod handshake;
pub mod state;

pub use baud::BaudRate;
pub use handshake::{IecHandshake, NegotiatedBaud};
pub use state::HandshakeState;
