//! Session layer for the DLMS serial client
//!
//! This crate provides the packet exchange engine that drives one
//! request/response cycle over a `Media`, the frame completion oracles for
//! HDLC and Wrapper framing, and the IEC 62056-21 opening sequence that
//! negotiates the line speed before binary framing starts.
//!
//! # TODO
//!
//! ## Packet exchange
//! - [x] Bounded send retries (3 attempts)
//! - [x] Partial frame reassembly without resend
//! - [x] Device error code surfacing
//! - [x] Exchange statistics
//!
//! ## Framing
//! - [x] HDLC address / frame / FCS / HCS
//! - [x] HDLC frame completion and FRMR/DM detection
//! - [x] Wrapper header / PDU
//! - [x] Wrapper frame completion
//!
//! ## IEC 62056-21
//! - [x] Identification request with echo suppression
//! - [x] Baud indicator table ('0'..'6')
//! - [x] Mode E switch to HDLC

pub mod exchange;
pub mod hdlc;
pub mod iec;
pub mod interface;
pub mod oracle;
pub mod statistics;
pub mod wrapper;

pub use dlms_core::{DlmsError, DlmsResult};
pub use exchange::{FrameBuffer, MAX_SEND_ATTEMPTS, PacketExchange};
pub use hdlc::{FrameType, HdlcAddress, HdlcFrame, HdlcFrameOracle};
pub use iec::{BaudRate, HandshakeState, IecHandshake, NegotiatedBaud};
pub use interface::InterfaceType;
pub use oracle::{FrameOracle, error_code};
pub use statistics::ExchangeStatistics;
pub use wrapper::{WRAPPER_HEADER_LENGTH, WrapperFrameOracle, WrapperHeader, WrapperPdu};
