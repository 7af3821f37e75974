use thiserror::Error;

/// Main error type for the DLMS serial client
#[derive(Error, Debug)]
pub enum DlmsError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    /// No reply (or not enough of one) arrived within the wait bound,
    /// either after the send retries ran out or while reassembling a frame.
    #[error("Failed to receive reply from the device in given time")]
    TransportTimeout,

    /// A complete frame carried a nonzero device-reported error code.
    #[error("Device reported error code {0}")]
    ProtocolError(u16),

    #[error("IEC handshake timed out waiting for identification")]
    HandshakeTimeout,

    #[error("Invalid IEC identification response: {0:?}")]
    InvalidHandshakeResponse(String),

    #[error("Unknown baud rate indicator: {0:?}")]
    UnknownBaudRate(char),
}

impl DlmsError {
    /// Shorthand for a `Connection` error of kind `NotConnected`
    pub fn not_connected(message: &str) -> Self {
        DlmsError::Connection(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            message.to_string(),
        ))
    }

    /// Whether the failure means the device never answered in time
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            DlmsError::Timeout | DlmsError::TransportTimeout | DlmsError::HandshakeTimeout
        )
    }
}

/// Result type alias for DLMS operations
pub type DlmsResult<T> = Result<T, DlmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = DlmsError::ProtocolError(3);
        assert_eq!(err.to_string(), "Device reported error code 3");
    }

    #[test]
    fn test_is_timeout() {
        assert!(DlmsError::TransportTimeout.is_timeout());
        assert!(DlmsError::HandshakeTimeout.is_timeout());
        assert!(!DlmsError::UnknownBaudRate('9').is_timeout());
    }

    #[test]
    fn test_not_connected() {
        match DlmsError::not_connected("Serial stream not connected") {
            DlmsError::Connection(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotConnected),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
