//! Frame completion oracle
//!
//! The exchange engine does not understand frames. After every physical
//! receive it asks an oracle whether the bytes collected so far hold a
//! complete frame and, once they do, which error code that frame carries.

/// Error codes reported by the built-in oracles
///
/// Application-specific oracles are free to use their own values; only
/// zero has a fixed meaning.
pub mod error_code {
    /// No error
    pub const NONE: u16 = 0;
    /// Bytes do not form a valid frame (bad format, length, flag or check sequence)
    pub const FRAME_INVALID: u16 = 0x0100;
    /// The device answered with an HDLC FRMR frame
    pub const FRAME_REJECTED: u16 = 0x0101;
    /// The device answered with an HDLC DM frame
    pub const DISCONNECT_MODE: u16 = 0x0102;
}

/// Decides when a reply is complete and extracts its error code
#[cfg_attr(test, mockall::automock)]
pub trait FrameOracle {
    /// Whether `data`, everything received in the current exchange, holds
    /// a complete frame
    fn is_frame_complete(&self, data: &[u8]) -> bool;

    /// Error code carried by a complete frame, 0 when there is none
    fn extract_error_code(&self, frame: &[u8]) -> u16;
}

impl<O: FrameOracle + ?Sized> FrameOracle for Box<O> {
    fn is_frame_complete(&self, data: &[u8]) -> bool {
        (**self).is_frame_complete(data)
    }

    fn extract_error_code(&self, frame: &[u8]) -> u16 {
        (**self).extract_error_code(frame)
    }
}
