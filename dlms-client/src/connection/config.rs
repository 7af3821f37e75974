//! Session configuration

use dlms_session::InterfaceType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything needed to open a session with one device
///
/// Can be loaded from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial port name (e.g., "/dev/ttyUSB0" or "COM1")
    pub port_name: String,
    /// Line speed when the IEC negotiation is not used
    pub baud_rate: u32,
    /// Binary framing on the line
    pub interface_type: InterfaceType,
    /// Upper bound on one physical receive
    pub wait_time: Duration,
    /// Negotiate the speed with the IEC 62056-21 sequence before connecting
    pub initialize_iec: bool,
    /// Pause between the switch command and the new line speed
    pub switch_delay: Duration,
    /// Protocol control character of the switch command
    pub control_character: u8,
    /// Mode control character of the switch command
    pub mode_control_character: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            interface_type: InterfaceType::Hdlc,
            wait_time: Duration::from_secs(9),
            initialize_iec: false,
            switch_delay: Duration::from_millis(500),
            control_character: b'2',
            mode_control_character: b'2',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.interface_type, InterfaceType::Hdlc);
        assert_eq!(config.wait_time, Duration::from_secs(9));
        assert_eq!(config.switch_delay, Duration::from_millis(500));
        assert!(!config.initialize_iec);
        assert_eq!(config.control_character, b'2');
        assert_eq!(config.mode_control_character, b'2');
    }
}
