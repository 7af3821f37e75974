//! Framing used on the line once binary communication starts

use crate::hdlc::{FLAG, HdlcFrameOracle};
use crate::oracle::FrameOracle;
use crate::wrapper::WrapperFrameOracle;
use dlms_transport::ReceiveParameters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum bytes a single physical receive has to collect
const MIN_RECEIVE_COUNT: usize = 5;

/// Binary framing of the device interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterfaceType {
    /// HDLC frames delimited by 0x7E flags
    #[default]
    Hdlc,
    /// Wrapper PDUs: 8-byte header announcing the payload length, no terminator
    Wrapper,
}

impl InterfaceType {
    /// Byte that may end a reply, if the framing has one
    pub fn end_of_packet(&self) -> Option<u8> {
        match self {
            InterfaceType::Hdlc => Some(FLAG),
            InterfaceType::Wrapper => None,
        }
    }

    /// How the exchange engine waits for replies on this interface
    pub fn receive_parameters(&self, wait_time: Duration) -> ReceiveParameters {
        ReceiveParameters {
            eop: self.end_of_packet(),
            count: MIN_RECEIVE_COUNT,
            wait_time,
            all_data: true,
        }
    }

    /// The frame completion oracle matching this framing
    pub fn frame_oracle(&self) -> Box<dyn FrameOracle + Send + Sync> {
        match self {
            InterfaceType::Hdlc => Box::new(HdlcFrameOracle::new()),
            InterfaceType::Wrapper => Box::new(WrapperFrameOracle::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_parameters() {
        let hdlc = InterfaceType::Hdlc.receive_parameters(Duration::from_secs(9));
        assert_eq!(hdlc.eop, Some(0x7E));
        assert_eq!(hdlc.count, 5);
        assert!(hdlc.all_data);
        assert_eq!(hdlc.wait_time, Duration::from_secs(9));

        let wrapper = InterfaceType::Wrapper.receive_parameters(Duration::from_secs(1));
        assert_eq!(wrapper.eop, None);
    }

    #[test]
    fn test_frame_oracle_matches_interface() {
        let oracle = InterfaceType::Wrapper.frame_oracle();
        // Wrapper header announcing a 2-byte payload
        let pdu = [0x00, 0x01, 0x00, 0x01, 0x00, 0x10, 0x00, 0x02, 0xC0, 0x01];
        assert!(oracle.is_frame_complete(&pdu));
        assert!(!oracle.is_frame_complete(&pdu[..9]));
    }
}
