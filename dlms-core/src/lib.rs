//! Core types for the DLMS serial client
//!
//! This crate provides the error type shared by the transport, session
//! and client crates.

pub mod error;

pub use error::{DlmsError, DlmsResult};
