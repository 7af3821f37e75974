//! Wrapper framing for DLMS/COSEM (IEC 62056-47)
//!
//! A Wrapper PDU is an 8-byte header (version, source and destination
//! wPort, payload length, all big-endian) followed by the payload. There is
//! no terminator, so completion is decided by the announced length alone.

use crate::oracle::{FrameOracle, error_code};
use dlms_core::{DlmsError, DlmsResult};

/// Wrapper header length
pub const WRAPPER_HEADER_LENGTH: usize = 8;

/// The only Wrapper version in use
pub const WRAPPER_VERSION: u16 = 0x0001;

/// Wrapper header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperHeader {
    source_wport: u16,
    destination_wport: u16,
    length: u16,
}

impl WrapperHeader {
    pub fn new(source_wport: u16, destination_wport: u16, length: u16) -> Self {
        Self {
            source_wport,
            destination_wport,
            length,
        }
    }

    pub fn encode(&self) -> [u8; WRAPPER_HEADER_LENGTH] {
        let mut out = [0u8; WRAPPER_HEADER_LENGTH];
        out[0..2].copy_from_slice(&WRAPPER_VERSION.to_be_bytes());
        out[2..4].copy_from_slice(&self.source_wport.to_be_bytes());
        out[4..6].copy_from_slice(&self.destination_wport.to_be_bytes());
        out[6..8].copy_from_slice(&self.length.to_be_bytes());
        out
    }

    pub fn decode(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < WRAPPER_HEADER_LENGTH {
            return Err(DlmsError::InvalidData(format!(
                "Wrapper header too short: expected {}, got {}",
                WRAPPER_HEADER_LENGTH,
                data.len()
            )));
        }
        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
        let version = word(0);
        if version != WRAPPER_VERSION {
            return Err(DlmsError::FrameInvalid(format!(
                "Header version was {}, this stack is only compatible to version 1",
                version
            )));
        }
        Ok(Self {
            source_wport: word(2),
            destination_wport: word(4),
            length: word(6),
        })
    }

    pub fn source_wport(&self) -> u16 {
        self.source_wport
    }

    pub fn destination_wport(&self) -> u16 {
        self.destination_wport
    }

    pub fn payload_length(&self) -> u16 {
        self.length
    }
}

/// Wrapper PDU (header plus payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperPdu {
    header: WrapperHeader,
    data: Vec<u8>,
}

impl WrapperPdu {
    /// PDU from `source_wport` to `destination_wport` carrying `data`
    pub fn new(source_wport: u16, destination_wport: u16, data: Vec<u8>) -> DlmsResult<Self> {
        let length = u16::try_from(data.len()).map_err(|_| {
            DlmsError::InvalidData(format!("Wrapper payload of {} bytes is too long", data.len()))
        })?;
        Ok(Self {
            header: WrapperHeader::new(source_wport, destination_wport, length),
            data,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(WRAPPER_HEADER_LENGTH + self.data.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode one PDU from the start of `data`; trailing bytes are ignored
    pub fn decode(data: &[u8]) -> DlmsResult<Self> {
        let header = WrapperHeader::decode(data)?;
        let end = WRAPPER_HEADER_LENGTH + header.payload_length() as usize;
        if data.len() < end {
            return Err(DlmsError::InvalidData(format!(
                "Wrapper payload incomplete: expected {} bytes, got {}",
                end - WRAPPER_HEADER_LENGTH,
                data.len() - WRAPPER_HEADER_LENGTH
            )));
        }
        Ok(Self {
            header,
            data: data[WRAPPER_HEADER_LENGTH..end].to_vec(),
        })
    }

    pub fn header(&self) -> &WrapperHeader {
        &self.header
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Oracle for Wrapper PDUs
///
/// Complete once the header and the payload length it announces are in.
/// A header with the wrong version counts as complete and reports
/// `FRAME_INVALID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapperFrameOracle;

impl WrapperFrameOracle {
    pub fn new() -> Self {
        Self
    }
}

impl FrameOracle for WrapperFrameOracle {
    fn is_frame_complete(&self, data: &[u8]) -> bool {
        if data.len() < WRAPPER_HEADER_LENGTH {
            return false;
        }
        match WrapperHeader::decode(data) {
            Ok(header) => data.len() >= WRAPPER_HEADER_LENGTH + header.payload_length() as usize,
            Err(_) => true,
        }
    }

    fn extract_error_code(&self, frame: &[u8]) -> u16 {
        match WrapperPdu::decode(frame) {
            Ok(_) => error_code::NONE,
            Err(e) => {
                log::debug!("Invalid Wrapper PDU: {}", e);
                error_code::FRAME_INVALID
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_header_encode_decode() {
        let header = WrapperHeader::new(0x0010, 0x0001, 100);
        let encoded = header.encode();
        assert_eq!(encoded, [0x00, 0x01, 0x00, 0x10, 0x00, 0x01, 0x00, 0x64]);
        assert_eq!(WrapperHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let data = [0x00, 0x02, 0x00, 0x10, 0x00, 0x01, 0x00, 0x00];
        assert!(WrapperHeader::decode(&data).is_err());
        let oracle = WrapperFrameOracle::new();
        assert!(oracle.is_frame_complete(&data));
        assert_eq!(oracle.extract_error_code(&data), error_code::FRAME_INVALID);
    }

    #[test]
    fn test_oracle_waits_for_announced_payload() {
        let pdu = WrapperPdu::new(0x0001, 0x0010, vec![0xC4, 0x01, 0xC1, 0x00])
            .unwrap()
            .encode();
        let oracle = WrapperFrameOracle::new();
        assert!(!oracle.is_frame_complete(&pdu[..5]));
        assert!(!oracle.is_frame_complete(&pdu[..pdu.len() - 1]));
        assert!(oracle.is_frame_complete(&pdu));
        assert_eq!(oracle.extract_error_code(&pdu), error_code::NONE);
        assert_eq!(WrapperPdu::decode(&pdu).unwrap().data(), &[0xC4, 0x01, 0xC1, 0x00]);
    }
}
