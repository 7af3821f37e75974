//! DLMS serial client
//!
//! Talks to a DLMS/COSEM device over a serial line: negotiates the line
//! speed with the IEC 62056-21 opening sequence, then drives binary
//! request/response exchanges (HDLC or Wrapper framing) with bounded send
//! retries and partial-frame reassembly.
//!
//! # Architecture
//!
//! - `dlms-core`: error handling
//! - `dlms-transport`: serial port, `Media` interface
//! - `dlms-session`: packet exchange engine, frame oracles, IEC negotiation
//! - `dlms-client`: session orchestration
//!
//! # Implementation Status
//!
//! ## Done
//! - Serial transport (tokio-serial) with line reconfiguration
//! - Packet exchange: 3 send attempts, reassembly, device error codes
//! - HDLC frame oracle (address, frame, FCS/HCS, FRMR/DM)
//! - Wrapper frame oracle
//! - IEC 62056-21 mode E negotiation
//! - Session open / request / close
//!
//! ## Not planned
//! - TCP/UDP transports
//! - Application layer encoding (supplied through `MessageProducer`)
//!
//! # Usage
//!
//! ```no_run
//! use dlms::client::SessionBuilder;
//! ```

// Re-export core types
pub use dlms_core::{DlmsError, DlmsResult};

// Re-export client API
pub mod client {
    pub use dlms_client::*;
}

pub mod session {
    pub use dlms_session::*;
}

pub mod transport {
    pub use dlms_transport::*;
}
