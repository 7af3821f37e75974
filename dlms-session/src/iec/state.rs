//! IEC handshake state machine

use dlms_core::{DlmsError, DlmsResult};

/// Progress of the IEC 62056-21 opening sequence
///
/// # State Transitions
/// ```text
/// Idle -> AwaitingIdentification (identification request sent)
/// AwaitingIdentification -> AwaitingBaudSwitchAck (valid identification parsed)
/// AwaitingBaudSwitchAck -> Complete (switch command sent)
/// AwaitingIdentification | AwaitingBaudSwitchAck -> Idle (attempt failed)
/// ```
///
/// The device does not acknowledge the switch command, so
/// `AwaitingBaudSwitchAck` only lasts while the command is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakeState {
    /// Nothing sent yet; the line is at 300 baud 7E1 once negotiation starts
    #[default]
    Idle,
    /// `/?!` sent, waiting for the `/XXXZ...` identification
    AwaitingIdentification,
    /// Speed accepted, switch command being sent
    AwaitingBaudSwitchAck,
    /// Device told to switch; binary framing may start
    Complete,
}

impl HandshakeState {
    pub fn is_complete(&self) -> bool {
        matches!(self, HandshakeState::Complete)
    }

    /// Validate state transition
    pub fn validate_transition(&self, new_state: HandshakeState) -> DlmsResult<()> {
        let valid = matches!(
            (*self, new_state),
            (HandshakeState::Idle, HandshakeState::AwaitingIdentification)
                | (HandshakeState::AwaitingIdentification, HandshakeState::AwaitingBaudSwitchAck)
                | (HandshakeState::AwaitingBaudSwitchAck, HandshakeState::Complete)
                | (HandshakeState::AwaitingIdentification, HandshakeState::Idle)
                | (HandshakeState::AwaitingBaudSwitchAck, HandshakeState::Idle)
        );

        if valid {
            Ok(())
        } else {
            Err(DlmsError::Protocol(format!(
                "Invalid IEC handshake transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakeState::Idle => "Idle",
            HandshakeState::AwaitingIdentification => "AwaitingIdentification",
            HandshakeState::AwaitingBaudSwitchAck => "AwaitingBaudSwitchAck",
            HandshakeState::Complete => "Complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let mut state = HandshakeState::default();
        for next in [
            HandshakeState::AwaitingIdentification,
            HandshakeState::AwaitingBaudSwitchAck,
            HandshakeState::Complete,
        ] {
            state.validate_transition(next).unwrap();
            state = next;
        }
        assert!(state.is_complete());
    }

    #[test]
    fn test_complete_is_final() {
        assert!(HandshakeState::Complete
            .validate_transition(HandshakeState::Idle)
            .is_err());
        assert!(HandshakeState::Complete
            .validate_transition(HandshakeState::AwaitingIdentification)
            .is_err());
    }

    #[test]
    fn test_cannot_skip_identification() {
        assert!(HandshakeState::Idle
            .validate_transition(HandshakeState::Complete)
            .is_err());
    }
}
