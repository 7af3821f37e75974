//! Message producer trait and session state
//!
//! The session does not know how link or application messages are encoded.
//! A `MessageProducer` builds every request and checks every reply, so the
//! same session drives any addressing scheme or security setup.
//!
//! # Session Lifecycle
//! 1. **Open**: negotiate (IEC) or open the line, connect, associate
//! 2. **Use**: `request()` data exchanges
//! 3. **Close**: disconnect, then close the line

use dlms_core::DlmsResult;

/// Builds outgoing messages and validates replies
///
/// Bytes are opaque to the session: they are handed to the packet
/// exchange engine as they are and replies come back as complete frames.
#[cfg_attr(test, mockall::automock)]
pub trait MessageProducer: Send {
    /// Link connect request (SNRM for HDLC); empty when the framing has none
    fn connect_request(&mut self) -> Vec<u8>;

    /// Check the reply to the connect request
    fn parse_connect_response(&mut self, reply: &[u8]) -> DlmsResult<()>;

    /// Association requests, sent in order; only the last reply is parsed
    fn associate_requests(&mut self) -> DlmsResult<Vec<Vec<u8>>>;

    /// Check the reply to the last association request
    fn parse_associate_response(&mut self, reply: &[u8]) -> DlmsResult<()>;

    /// Link disconnect request (DISC for HDLC); empty when there is none
    fn disconnect_request(&mut self) -> Vec<u8>;
}

/// Session state
///
/// - `Closed` -> `Negotiated` (line open at its binary speed)
/// - `Negotiated` -> `Connected` (connect reply accepted or no connect needed)
/// - `Connected` -> `Ready` (association reply accepted)
/// - Any state -> `Closed` (close() or a failed open())
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Negotiated,
    Connected,
    Ready,
}

impl SessionState {
    /// Check if data requests may be sent
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn can_close(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Closed => "Closed",
            SessionState::Negotiated => "Negotiated",
            SessionState::Connected => "Connected",
            SessionState::Ready => "Ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state() {
        assert_eq!(SessionState::default(), SessionState::Closed);
        assert!(!SessionState::Closed.can_close());
        assert!(SessionState::Negotiated.can_close());
        assert!(!SessionState::Connected.is_ready());
        assert!(SessionState::Ready.is_ready());
    }
}
