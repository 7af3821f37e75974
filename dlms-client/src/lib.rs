//! DLMS serial client
//!
//! This crate drives a device session over a serial line: optional IEC
//! 62056-21 speed negotiation, link connect, application association,
//! data requests and disconnect. The bytes of each message come from a
//! `MessageProducer`; this crate only moves them through the packet
//! exchange engine.
//!
//! # TODO
//!
//! ## Session
//! - [x] Builder and serde-friendly configuration
//! - [x] IEC 62056-21 negotiation before binary framing
//! - [x] Connect / associate / request / disconnect flow
//! - [x] Media always closed on `close()`
//! - [ ] Automatic reconnect after a lost link

pub mod connection;

pub use connection::{
    MessageProducer, Session, SessionBuilder, SessionConfig, SessionState, SerialSession,
};
