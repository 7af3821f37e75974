//! HDLC frame structure and encoding/decoding
//!
//! Frame layout between the two flags (IEC 62056-46):
//!
//! ```text
//! format(2) | destination(1,2,4) | source(1) | control(1) | [HCS(2) | information | ] FCS(2)
//! ```
//!
//! The format field holds type 3 (0xA), the segmentation bit and an 11-bit
//! length that counts every byte between the flags. HCS covers the header,
//! FCS covers everything before it.

use crate::hdlc::address::HdlcAddress;
use crate::hdlc::fcs::{check_fcs16, fcs16};
use dlms_core::{DlmsError, DlmsResult};
use std::fmt;

/// HDLC frame flag
pub const FLAG: u8 = 0x7E;

/// LLC header of a request from the client
pub const LLC_REQUEST: [u8; 3] = [0xE6, 0xE6, 0x00];

/// LLC header of a response from the server
pub const LLC_RESPONSE: [u8; 3] = [0xE6, 0xE7, 0x00];

const FORMAT_TYPE_3: u8 = 0xA0;
const SEGMENTATION_BIT: u8 = 0x08;
const LENGTH_MASK: u16 = 0x07FF;
const POLL_FINAL_BIT: u8 = 0x10;

/// Smallest frame: format, two 1-byte addresses, control, FCS
pub const MIN_FRAME_LENGTH: usize = 7;

/// HDLC frame type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Information,
    ReceiveReady,
    ReceiveNotReady,
    SetNormalResponseMode,
    Disconnect,
    UnnumberedAcknowledge,
    DisconnectMode,
    FrameReject,
    UnnumberedInformation,
    InvalidType,
}

impl FrameType {
    /// Get frame type from control byte
    pub fn from_control_byte(control: u8) -> Self {
        match control {
            x if x & 0x01 == 0x00 => FrameType::Information,
            x if x & 0x0F == 0x01 => FrameType::ReceiveReady,
            x if x & 0x0F == 0x05 => FrameType::ReceiveNotReady,
            x if x & 0xEF == 0x83 => FrameType::SetNormalResponseMode,
            x if x & 0xEF == 0x43 => FrameType::Disconnect,
            x if x & 0xEF == 0x63 => FrameType::UnnumberedAcknowledge,
            x if x & 0xEF == 0x0F => FrameType::DisconnectMode,
            x if x & 0xEF == 0x87 => FrameType::FrameReject,
            x if x & 0xEF == 0x03 => FrameType::UnnumberedInformation,
            _ => FrameType::InvalidType,
        }
    }

    /// Control byte of an unnumbered frame of this type, poll/final bit set
    pub fn unnumbered_control(&self) -> Option<u8> {
        let base = match self {
            FrameType::SetNormalResponseMode => 0x83,
            FrameType::Disconnect => 0x43,
            FrameType::UnnumberedAcknowledge => 0x63,
            FrameType::DisconnectMode => 0x0F,
            FrameType::FrameReject => 0x87,
            FrameType::UnnumberedInformation => 0x03,
            _ => return None,
        };
        Some(base | POLL_FINAL_BIT)
    }
}

/// One decoded HDLC frame
#[derive(Debug, Clone, PartialEq)]
pub struct HdlcFrame {
    destination: HdlcAddress,
    source: HdlcAddress,
    control: u8,
    segmented: bool,
    information: Vec<u8>,
}

impl HdlcFrame {
    pub fn new(
        destination: HdlcAddress,
        source: HdlcAddress,
        control: u8,
        information: Vec<u8>,
    ) -> Self {
        Self {
            destination,
            source,
            control,
            segmented: false,
            information,
        }
    }

    /// Unnumbered frame (SNRM, DISC, UA, DM, FRMR, UI)
    pub fn unnumbered(
        destination: HdlcAddress,
        source: HdlcAddress,
        frame_type: FrameType,
        information: Vec<u8>,
    ) -> DlmsResult<Self> {
        let control = frame_type.unnumbered_control().ok_or_else(|| {
            DlmsError::InvalidData(format!("{:?} is not an unnumbered frame type", frame_type))
        })?;
        Ok(Self::new(destination, source, control, information))
    }

    pub fn with_segmentation(mut self, segmented: bool) -> Self {
        self.segmented = segmented;
        self
    }

    /// Decode the bytes between the opening and the closing flag
    pub fn decode(frame: &[u8]) -> DlmsResult<Self> {
        if frame.len() < MIN_FRAME_LENGTH {
            return Err(DlmsError::FrameInvalid(format!(
                "Frame too short: {} bytes",
                frame.len()
            )));
        }

        if frame[0] & 0xF0 != FORMAT_TYPE_3 {
            return Err(DlmsError::FrameInvalid(format!(
                "Illegal frame format: 0x{:02X}",
                frame[0]
            )));
        }
        let segmented = frame[0] & SEGMENTATION_BIT != 0;
        let length = (u16::from_be_bytes([frame[0], frame[1]]) & LENGTH_MASK) as usize;
        if length != frame.len() {
            return Err(DlmsError::FrameInvalid(format!(
                "Frame length field says {} bytes, got {}",
                length,
                frame.len()
            )));
        }

        let mut pos = 2;
        let (destination, len) = HdlcAddress::read_from(&frame[pos..])?;
        pos += len;
        let (source, len) = HdlcAddress::read_from(&frame[pos..])?;
        pos += len;

        if pos + 3 > frame.len() {
            return Err(DlmsError::FrameInvalid(
                "Frame too short for control field and FCS".to_string(),
            ));
        }
        let control = frame[pos];
        pos += 1;

        let information = if pos + 2 == frame.len() {
            Vec::new()
        } else {
            if pos + 4 > frame.len() {
                return Err(DlmsError::FrameInvalid(
                    "Frame too short for HCS and FCS".to_string(),
                ));
            }
            check_fcs16(&frame[..pos + 2])
                .map_err(|e| DlmsError::FrameInvalid(format!("HCS check failed: {}", e)))?;
            frame[pos + 2..frame.len() - 2].to_vec()
        };
        check_fcs16(frame)?;

        Ok(Self {
            destination,
            source,
            control,
            segmented,
            information,
        })
    }

    /// Encode to wire bytes, flags included
    pub fn encode(&self) -> DlmsResult<Vec<u8>> {
        let mut header = vec![0u8, 0u8];
        header.extend_from_slice(&self.destination.encode());
        header.extend_from_slice(&self.source.encode());
        header.push(self.control);

        let length = if self.information.is_empty() {
            header.len() + 2
        } else {
            header.len() + 2 + self.information.len() + 2
        };
        if length > LENGTH_MASK as usize {
            return Err(DlmsError::InvalidData(format!(
                "Frame of {} bytes exceeds the 11-bit length field",
                length
            )));
        }
        let segmentation = if self.segmented { SEGMENTATION_BIT } else { 0 };
        let format = FORMAT_TYPE_3 | segmentation | ((length >> 8) as u8 & 0x07);
        header[0] = format;
        header[1] = length as u8;

        let mut body = header;
        if !self.information.is_empty() {
            let hcs = fcs16(&body);
            body.extend_from_slice(&hcs);
            body.extend_from_slice(&self.information);
        }
        let fcs = fcs16(&body);
        body.extend_from_slice(&fcs);

        let mut wire = Vec::with_capacity(body.len() + 2);
        wire.push(FLAG);
        wire.extend_from_slice(&body);
        wire.push(FLAG);
        Ok(wire)
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from_control_byte(self.control)
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn destination(&self) -> HdlcAddress {
        self.destination
    }

    pub fn source(&self) -> HdlcAddress {
        self.source
    }

    pub fn information_field(&self) -> &[u8] {
        &self.information
    }

    /// Information field with the LLC header stripped, if it has one
    pub fn payload(&self) -> &[u8] {
        self.information
            .strip_prefix(&LLC_RESPONSE)
            .or_else(|| self.information.strip_prefix(&LLC_REQUEST))
            .unwrap_or(&self.information)
    }

    /// More segments of the same message follow
    pub fn is_segmented(&self) -> bool {
        self.segmented
    }
}

impl fmt::Display for HdlcFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HDLC Frame: type={:?}, src={}, dst={}, info={}",
            self.frame_type(),
            self.source,
            self.destination,
            self.information.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNRM: [u8; 9] = [0x7E, 0xA0, 0x07, 0x03, 0x21, 0x93, 0x0F, 0x01, 0x7E];

    fn client() -> HdlcAddress {
        HdlcAddress::new(0x10).unwrap()
    }

    fn server() -> HdlcAddress {
        HdlcAddress::new(0x01).unwrap()
    }

    #[test]
    fn test_frame_type_from_control() {
        assert_eq!(FrameType::from_control_byte(0x10), FrameType::Information);
        assert_eq!(FrameType::from_control_byte(0x31), FrameType::ReceiveReady);
        assert_eq!(FrameType::from_control_byte(0x93), FrameType::SetNormalResponseMode);
        assert_eq!(FrameType::from_control_byte(0x73), FrameType::UnnumberedAcknowledge);
        assert_eq!(FrameType::from_control_byte(0x1F), FrameType::DisconnectMode);
        assert_eq!(FrameType::from_control_byte(0x97), FrameType::FrameReject);
    }

    #[test]
    fn test_encode_snrm() {
        let frame =
            HdlcFrame::unnumbered(server(), client(), FrameType::SetNormalResponseMode, vec![])
                .unwrap();
        assert_eq!(frame.encode().unwrap(), SNRM.to_vec());
    }

    #[test]
    fn test_decode_snrm() {
        let frame = HdlcFrame::decode(&SNRM[1..SNRM.len() - 1]).unwrap();
        assert_eq!(frame.frame_type(), FrameType::SetNormalResponseMode);
        assert_eq!(frame.destination().logical_id(), 0x01);
        assert_eq!(frame.source().logical_id(), 0x10);
        assert!(frame.information_field().is_empty());
    }

    #[test]
    fn test_information_frame_checks_hcs_and_fcs() {
        let mut info = LLC_RESPONSE.to_vec();
        info.extend_from_slice(&[0xC4, 0x01, 0xC1, 0x00]);
        let frame = HdlcFrame::new(client(), server(), 0x30, info);
        let wire = frame.encode().unwrap();

        let decoded = HdlcFrame::decode(&wire[1..wire.len() - 1]).unwrap();
        assert_eq!(decoded.frame_type(), FrameType::Information);
        assert_eq!(decoded.payload(), &[0xC4, 0x01, 0xC1, 0x00]);

        let mut corrupted = wire.clone();
        corrupted[10] ^= 0x01;
        assert!(HdlcFrame::decode(&corrupted[1..corrupted.len() - 1]).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let mut body = SNRM[1..SNRM.len() - 1].to_vec();
        body.push(0x00);
        assert!(HdlcFrame::decode(&body).is_err());
    }
}
