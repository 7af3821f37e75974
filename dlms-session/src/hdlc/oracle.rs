//! Frame completion for HDLC replies

use crate::hdlc::frame::{FLAG, FrameType, HdlcFrame, MIN_FRAME_LENGTH};
use crate::oracle::{FrameOracle, error_code};
use dlms_core::{DlmsError, DlmsResult};

const LENGTH_MASK: u16 = 0x07FF;

/// Where the first frame in a receive buffer stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// More bytes are needed
    Incomplete,
    /// The bytes after the opening flag cannot start a frame
    Malformed,
    /// Frame body is `data[start..end]`, `data[end]` should be the closing flag
    Complete { start: usize, end: usize },
}

fn scan(data: &[u8]) -> Scan {
    let Some(mut open) = data.iter().position(|&b| b == FLAG) else {
        return Scan::Incomplete;
    };
    // Back-to-back flags: the last one opens the frame
    while data.get(open + 1) == Some(&FLAG) {
        open += 1;
    }
    let start = open + 1;
    if data.len() < start + 2 {
        return Scan::Incomplete;
    }
    if data[start] & 0xF0 != 0xA0 {
        return Scan::Malformed;
    }
    let length = (u16::from_be_bytes([data[start], data[start + 1]]) & LENGTH_MASK) as usize;
    if length < MIN_FRAME_LENGTH {
        return Scan::Malformed;
    }
    let end = start + length;
    if data.len() <= end {
        return Scan::Incomplete;
    }
    Scan::Complete { start, end }
}

/// Oracle for flag-delimited HDLC frames
///
/// A reply is complete once the first frame announced by its length field
/// has arrived together with its closing flag. Noise before the opening
/// flag is skipped. Bytes that cannot start a frame count as complete so
/// the exchange stops waiting; they then report `FRAME_INVALID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HdlcFrameOracle;

impl HdlcFrameOracle {
    pub fn new() -> Self {
        Self
    }

    /// Decode the first complete frame in `data`
    pub fn first_frame(data: &[u8]) -> Option<HdlcFrame> {
        decode_first(data).ok()
    }
}

fn decode_first(data: &[u8]) -> DlmsResult<HdlcFrame> {
    match scan(data) {
        Scan::Complete { start, end } if data[end] == FLAG => HdlcFrame::decode(&data[start..end]),
        Scan::Complete { .. } => Err(DlmsError::FrameInvalid(
            "HDLC frame not followed by a closing flag".to_string(),
        )),
        Scan::Malformed => Err(DlmsError::FrameInvalid(
            "Bytes after the opening flag cannot start an HDLC frame".to_string(),
        )),
        Scan::Incomplete => Err(DlmsError::FrameInvalid("HDLC frame incomplete".to_string())),
    }
}

impl FrameOracle for HdlcFrameOracle {
    fn is_frame_complete(&self, data: &[u8]) -> bool {
        scan(data) != Scan::Incomplete
    }

    fn extract_error_code(&self, frame: &[u8]) -> u16 {
        match decode_first(frame) {
            Ok(decoded) => match decoded.frame_type() {
                FrameType::FrameReject => error_code::FRAME_REJECTED,
                FrameType::DisconnectMode => error_code::DISCONNECT_MODE,
                FrameType::InvalidType => error_code::FRAME_INVALID,
                _ => error_code::NONE,
            },
            Err(e) => {
                log::debug!("Invalid HDLC frame: {}", e);
                error_code::FRAME_INVALID
            }
        }
    }
}
