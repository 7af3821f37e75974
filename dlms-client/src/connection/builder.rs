//! Session builder
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use dlms_client::SessionBuilder;
//!
//! # fn run(producer: impl dlms_client::MessageProducer) -> dlms_core::DlmsResult<()> {
//! let session = SessionBuilder::new()
//!     .serial("/dev/ttyUSB0", 9600)
//!     .initialize_iec(true)
//!     .build(producer)?;
//! # Ok(())
//! # }
//! ```

use super::config::SessionConfig;
use super::connection::MessageProducer;
use super::session::{SerialSession, Session};
use dlms_core::{DlmsError, DlmsResult};
use dlms_session::InterfaceType;
use dlms_transport::{Media, SerialLine, SerialSettings, SerialTransport, StreamMedia};
use std::time::Duration;

/// Builder for creating sessions
///
/// # Configuration Flow
/// 1. Create builder with `SessionBuilder::new()` (or from a loaded config)
/// 2. Configure the port and framing
/// 3. Build with `build()` for the system serial port or `build_with_media()`
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Configure the serial port and the speed used without IEC negotiation
    pub fn serial(mut self, port_name: &str, baud_rate: u32) -> Self {
        self.config.port_name = port_name.to_string();
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn interface_type(mut self, interface_type: InterfaceType) -> Self {
        self.config.interface_type = interface_type;
        self
    }

    /// Upper bound on one physical receive (default 9 s)
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.config.wait_time = wait_time;
        self
    }

    pub fn initialize_iec(mut self, enabled: bool) -> Self {
        self.config.initialize_iec = enabled;
        self
    }

    /// Pause after the IEC switch command (default 500 ms)
    pub fn switch_delay(mut self, delay: Duration) -> Self {
        self.config.switch_delay = delay;
        self
    }

    /// Protocol and mode control characters of the IEC switch command
    pub fn control_characters(mut self, control: u8, mode_control: u8) -> Self {
        self.config.control_character = control;
        self.config.mode_control_character = mode_control;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build a session on the configured serial port
    ///
    /// The port is not opened until `Session::open()`.
    ///
    /// # Errors
    /// Returns error if no port name is configured or the receive wait is zero
    pub fn build<P: MessageProducer>(self, producer: P) -> DlmsResult<SerialSession<P>> {
        if self.config.port_name.is_empty() {
            return Err(DlmsError::InvalidData(
                "Serial port name must be configured".to_string(),
            ));
        }
        self.validate()?;
        let transport = SerialTransport::new(SerialSettings::new(
            self.config.port_name.clone(),
            self.config.baud_rate,
        ));
        Ok(Session::new(self.config, StreamMedia::new(transport), producer))
    }

    /// Build a session on any media
    pub fn build_with_media<M, P>(self, media: M, producer: P) -> DlmsResult<Session<M, P>>
    where
        M: Media + SerialLine,
        P: MessageProducer,
    {
        self.validate()?;
        Ok(Session::new(self.config, media, producer))
    }

    fn validate(&self) -> DlmsResult<()> {
        if self.config.wait_time.is_zero() {
            return Err(DlmsError::InvalidData(
                "Receive wait time must be greater than zero".to_string(),
            ));
        }
        if !self.config.initialize_iec && self.config.baud_rate == 0 {
            return Err(DlmsError::InvalidData(
                "Baud rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connection::MockMessageProducer;
    use crate::connection::connection::SessionState;
    use dlms_transport::mock::ScriptedMedia;

    #[test]
    fn test_build_requires_port_name() {
        assert!(matches!(
            SessionBuilder::new().build(MockMessageProducer::new()),
            Err(DlmsError::InvalidData(_))
        ));
    }

    #[test]
    fn test_build_serial_session() {
        let session = SessionBuilder::new()
            .serial("/dev/ttyUSB0", 2400)
            .interface_type(InterfaceType::Wrapper)
            .initialize_iec(true)
            .switch_delay(Duration::from_millis(300))
            .build(MockMessageProducer::new())
            .unwrap();

        let config = session.config();
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 2400);
        assert_eq!(config.interface_type, InterfaceType::Wrapper);
        assert_eq!(config.switch_delay, Duration::from_millis(300));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_zero_wait_time_rejected() {
        let result = SessionBuilder::new()
            .wait_time(Duration::ZERO)
            .build_with_media(ScriptedMedia::new(), MockMessageProducer::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_control_characters_override_config() {
        let config = SessionConfig {
            control_character: b'0',
            mode_control_character: b'1',
            ..SessionConfig::default()
        };
        let builder = SessionBuilder::from_config(config).control_characters(b'2', b'2');
        assert_eq!(builder.config().control_character, b'2');
        assert_eq!(builder.config().mode_control_character, b'2');
    }
}
