//! Serial port transport implementation

use crate::media::LineSettings;
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use dlms_core::{DlmsError, DlmsResult};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialStream};

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

/// Serial port transport layer settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub line: LineSettings,
    pub flow_control: tokio_serial::FlowControl,
}

impl SerialSettings {
    /// 8N1 settings at `baud_rate`
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_line(port_name, LineSettings::binary(baud_rate))
    }

    pub fn with_line(port_name: impl Into<String>, line: LineSettings) -> Self {
        Self {
            port_name: port_name.into(),
            line,
            flow_control: tokio_serial::FlowControl::None,
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Change the character framing, applying it to the open port if any
    pub fn apply_line(&mut self, line: LineSettings) -> DlmsResult<()> {
        if let Some(stream) = self.stream.as_mut() {
            let port = &mut stream.0;
            port.set_baud_rate(line.baud_rate).map_err(serial_error)?;
            port.set_data_bits(line.data_bits).map_err(serial_error)?;
            port.set_parity(line.parity).map_err(serial_error)?;
            port.set_stop_bits(line.stop_bits).map_err(serial_error)?;
        }
        log::debug!(
            "{}: line set to {} baud {:?} {:?} {:?}",
            self.settings.port_name,
            line.baud_rate,
            line.data_bits,
            line.parity,
            line.stop_bits
        );
        self.settings.line = line;
        Ok(())
    }

    fn stream_mut(&mut self) -> DlmsResult<&mut SerialStream> {
        self.stream
            .as_mut()
            .map(|s| &mut s.0)
            .ok_or_else(|| DlmsError::not_connected("Serial stream not connected"))
    }
}

fn serial_error(e: tokio_serial::Error) -> DlmsError {
    DlmsError::Connection(std::io::Error::other(format!("Serial port error: {}", e)))
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> DlmsResult<()> {
        if self.stream.is_some() {
            return Err(DlmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let line = self.settings.line;
        let builder = tokio_serial::new(&self.settings.port_name, line.baud_rate)
            .data_bits(line.data_bits)
            .stop_bits(line.stop_bits)
            .parity(line.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            DlmsError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        log::info!(
            "Opened {} at {} baud",
            self.settings.port_name,
            line.baud_rate
        );
        self.stream = Some(DebugSerialStream(stream));
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> DlmsResult<usize> {
        let stream = self.stream_mut()?;
        let result = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| DlmsError::Timeout)?;

        match result {
            Ok(n) => Ok(n),
            Err(e) => {
                self.stream = None;
                Err(DlmsError::Connection(e))
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> DlmsResult<usize> {
        let stream = self.stream_mut()?;
        stream.write(buf).await.map_err(DlmsError::Connection)
    }

    async fn flush(&mut self) -> DlmsResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(DlmsError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    async fn close(&mut self) -> DlmsResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.0.flush().await;
            log::info!("Closed {}", self.settings.port_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::{DataBits, Parity};

    #[test]
    fn test_serial_settings() {
        let settings = SerialSettings::new("/dev/ttyUSB0", 9600);
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.line.baud_rate, 9600);
        assert_eq!(settings.line.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_apply_line_while_closed_only_updates_settings() {
        let mut transport = SerialTransport::new(SerialSettings::new("/dev/ttyUSB0", 9600));
        transport.apply_line(LineSettings::iec_initial()).unwrap();
        assert_eq!(transport.settings().line.baud_rate, 300);
        assert_eq!(transport.settings().line.parity, Parity::Even);
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_read_without_open_fails() {
        let mut transport = SerialTransport::new(SerialSettings::new("/dev/ttyUSB0", 9600));
        let mut buf = [0u8; 8];
        let err = transport
            .read_within(&mut buf, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DlmsError::Connection(_)));
    }
}
