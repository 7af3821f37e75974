//! Transport layer for the DLMS serial client
//!
//! This crate provides the byte-stream abstraction, the tokio-serial based
//! serial port, and the `Media` interface the packet exchange engine and
//! the IEC handshake talk to.

pub mod media;
pub mod serial;
pub mod stream;
pub mod stream_media;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use dlms_core::{DlmsError, DlmsResult};
pub use media::{LineSettings, Media, ReceiveParameters, SerialLine, SharedMedia};
pub use serial::{SerialSettings, SerialTransport};
pub use stream::{StreamAccessor, TransportLayer};
pub use stream_media::StreamMedia;
pub use tokio_serial::{DataBits, FlowControl, Parity, StopBits};
