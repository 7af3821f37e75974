//! IEC 62056-21 opening sequence (protocol mode E)
//!
//! ```text
//! client                         device        line
//!   |--- /?!<CR><LF> ------------->|          300 7E1
//!   |<-- /XXXZ<ident><CR><LF> -----|          300 7E1
//!   |--- <ACK>2Z2<CR><LF> -------->|          300 7E1
//!   |                              |  both switch to Z, 8N1
//! ```
//!
//! Optical reading heads and some RS-485 converters echo what they send, so the
//! first line read back may be our own request.

use super::baud::BaudRate;
use super::state::HandshakeState;
use bytes::BytesMut;
use dlms_core::{DlmsError, DlmsResult};
use dlms_transport::{LineSettings, Media, ReceiveParameters, SerialLine, SharedMedia};
use std::time::Duration;

/// Sign-on message: start character, request command, end character, CR LF
pub const IDENTIFICATION_REQUEST: &[u8] = b"/?!\r\n";

/// First byte of every identification message
pub const IDENTIFICATION_MARKER: u8 = b'/';

/// Position of the baud rate indicator in `/XXXZ...`
pub const BAUD_INDICATOR_OFFSET: usize = 4;

pub const LINE_TERMINATOR: u8 = b'\n';

pub const ACK: u8 = 0x06;

/// Protocol control character selecting HDLC after the switch
pub const PROTOCOL_CONTROL_HDLC: u8 = b'2';

/// Mode control character selecting binary mode
pub const MODE_CONTROL_BINARY: u8 = b'2';

/// Outcome of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedBaud {
    baud_rate: BaudRate,
    identification: String,
}

impl NegotiatedBaud {
    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }

    /// Identification line as sent by the device, without CR LF
    pub fn identification(&self) -> &str {
        &self.identification
    }
}

/// Negotiates the line speed with a device before binary framing starts
///
/// One instance runs the sequence once. If it fails part way the state
/// falls back to `Idle` and `negotiate` may be called again; once it
/// completed, further calls are rejected.
#[derive(Debug, Clone)]
pub struct IecHandshake {
    state: HandshakeState,
    wait_time: Duration,
    control_character: u8,
    mode_control_character: u8,
}

impl IecHandshake {
    pub fn new(wait_time: Duration) -> Self {
        Self {
            state: HandshakeState::Idle,
            wait_time,
            control_character: PROTOCOL_CONTROL_HDLC,
            mode_control_character: MODE_CONTROL_BINARY,
        }
    }

    pub fn with_control_characters(mut self, control: u8, mode_control: u8) -> Self {
        self.control_character = control;
        self.mode_control_character = mode_control;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }

    /// Acknowledgement/option select message for `baud_rate`
    pub fn switch_command(&self, baud_rate: BaudRate) -> [u8; 6] {
        [
            ACK,
            self.control_character,
            baud_rate.indicator() as u8,
            self.mode_control_character,
            b'\r',
            b'\n',
        ]
    }

    /// Read the advertised speed out of an identification message
    pub fn parse_identification(reply: &[u8]) -> DlmsResult<BaudRate> {
        match reply.first() {
            Some(&IDENTIFICATION_MARKER) => {}
            Some(other) => {
                return Err(DlmsError::InvalidHandshakeResponse(format!(
                    "Identification starts with 0x{:02X} instead of '/'",
                    other
                )));
            }
            None => {
                return Err(DlmsError::InvalidHandshakeResponse(
                    "Empty identification message".to_string(),
                ));
            }
        }
        let indicator = reply.get(BAUD_INDICATOR_OFFSET).ok_or_else(|| {
            DlmsError::InvalidHandshakeResponse(format!(
                "Identification of {} bytes carries no baud rate indicator",
                reply.len()
            ))
        })?;
        BaudRate::from_indicator(*indicator as char)
    }

    /// Run the opening sequence on `media`
    ///
    /// The line is left at 300 baud 7E1; switching it to the negotiated
    /// speed is up to the caller, after the device had time to switch.
    pub async fn negotiate<M>(&mut self, media: &SharedMedia<M>) -> DlmsResult<NegotiatedBaud>
    where
        M: Media + SerialLine,
    {
        self.transition_to(HandshakeState::AwaitingIdentification)?;

        let mut guard = media.synchronous().await;
        match self.run(&mut *guard).await {
            Ok(negotiated) => Ok(negotiated),
            Err(e) => {
                log::warn!("IEC handshake failed in state {}: {}", self.state.as_str(), e);
                self.state = HandshakeState::Idle;
                Err(e)
            }
        }
    }

    async fn run<M>(&mut self, media: &mut M) -> DlmsResult<NegotiatedBaud>
    where
        M: Media + SerialLine,
    {
        media.set_line_settings(LineSettings::iec_initial()).await?;
        if !media.is_open() {
            media.open().await?;
        }

        let params = ReceiveParameters::until(LINE_TERMINATOR, self.wait_time);
        media.send(IDENTIFICATION_REQUEST).await?;

        let mut reply = BytesMut::new();
        if !media.receive(&params, &mut reply).await? {
            return Err(DlmsError::HandshakeTimeout);
        }
        if reply.as_ref() == IDENTIFICATION_REQUEST {
            log::debug!("Discarding echo of the identification request");
            reply.clear();
            if !media.receive(&params, &mut reply).await? {
                return Err(DlmsError::HandshakeTimeout);
            }
        }

        let identification = String::from_utf8_lossy(&reply).trim_end().to_string();
        log::info!("IEC identification: {}", identification);
        let baud_rate = Self::parse_identification(&reply)?;

        self.transition_to(HandshakeState::AwaitingBaudSwitchAck)?;
        let command = self.switch_command(baud_rate);
        media.send(&command).await?;
        self.transition_to(HandshakeState::Complete)?;

        log::info!("IEC handshake complete, device switching to {}", baud_rate);
        Ok(NegotiatedBaud {
            baud_rate,
            identification,
        })
    }

    fn transition_to(&mut self, new_state: HandshakeState) -> DlmsResult<()> {
        self.state.validate_transition(new_state)?;
        self.state = new_state;
        Ok(())
    }
}

impl Default for IecHandshake {
    fn default() -> Self {
        Self::new(Duration::from_secs(9))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlms_transport::DataBits;
    use dlms_transport::Parity;
    use dlms_transport::mock::ScriptedMedia;

    const IDENT: &[u8] = b"/ISK5\\2ME382\r\n";

    #[tokio::test]
    async fn test_negotiates_advertised_speed() {
        let media = SharedMedia::new(ScriptedMedia::new().reply(IDENT));
        let mut handshake = IecHandshake::default();

        let negotiated = handshake.negotiate(&media).await.unwrap();
        assert_eq!(negotiated.baud_rate(), BaudRate::B9600);
        assert_eq!(negotiated.identification(), "/ISK5\\2ME382");
        assert_eq!(handshake.state(), HandshakeState::Complete);

        let guard = media.synchronous().await;
        assert_eq!(guard.open_count(), 1);
        assert_eq!(
            guard.sent(),
            &[
                IDENTIFICATION_REQUEST.to_vec(),
                vec![0x06, b'2', b'5', b'2', 0x0D, 0x0A]
            ]
        );
        let line = guard.line_history()[0];
        assert_eq!(line.baud_rate, 300);
        assert_eq!(line.data_bits, DataBits::Seven);
        assert_eq!(line.parity, Parity::Even);
        let params = guard.last_params().unwrap();
        assert_eq!(params.eop, Some(b'\n'));
        assert_eq!(params.wait_time, Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_echo_is_discarded_once() {
        let media = SharedMedia::new(
            ScriptedMedia::new()
                .reply(IDENTIFICATION_REQUEST)
                .reply(b"/LGZ4ZMD3104407\r\n".to_vec()),
        );
        let mut handshake = IecHandshake::default();

        let negotiated = handshake.negotiate(&media).await.unwrap();
        assert_eq!(negotiated.baud_rate(), BaudRate::B4800);
        assert_eq!(media.synchronous().await.receive_count(), 2);
    }

    #[tokio::test]
    async fn test_second_echo_is_used_as_reply() {
        let media = SharedMedia::new(
            ScriptedMedia::new()
                .reply(IDENTIFICATION_REQUEST)
                .reply(IDENTIFICATION_REQUEST)
                .reply(IDENT),
        );
        let mut handshake = IecHandshake::default();

        match handshake.negotiate(&media).await {
            Err(DlmsError::UnknownBaudRate(c)) => assert_eq!(c, '\n'),
            other => panic!("unexpected result {:?}", other),
        }
        let guard = media.synchronous().await;
        assert_eq!(guard.receive_count(), 2);
        assert_eq!(guard.send_count(), 1);
        assert_eq!(handshake.state(), HandshakeState::Idle);
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        let media = SharedMedia::new(ScriptedMedia::new().timeout());
        let mut handshake = IecHandshake::new(Duration::from_secs(2));

        assert!(matches!(
            handshake.negotiate(&media).await,
            Err(DlmsError::HandshakeTimeout)
        ));
        assert_eq!(media.synchronous().await.send_count(), 1);
    }

    #[tokio::test]
    async fn test_echo_then_silence_times_out() {
        let media = SharedMedia::new(
            ScriptedMedia::new()
                .reply(IDENTIFICATION_REQUEST)
                .timeout(),
        );
        let mut handshake = IecHandshake::default();

        assert!(matches!(
            handshake.negotiate(&media).await,
            Err(DlmsError::HandshakeTimeout)
        ));
    }

    #[tokio::test]
    async fn test_reply_without_start_character() {
        let media = SharedMedia::new(ScriptedMedia::new().reply(b"ISK5\\2ME382\r\n".to_vec()));
        let mut handshake = IecHandshake::default();

        assert!(matches!(
            handshake.negotiate(&media).await,
            Err(DlmsError::InvalidHandshakeResponse(_))
        ));
        // no switch command after a rejected identification
        assert_eq!(media.synchronous().await.send_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_attempt_can_be_retried() {
        let media = SharedMedia::new(ScriptedMedia::new().timeout().reply(IDENT));
        let mut handshake = IecHandshake::default();

        assert!(handshake.negotiate(&media).await.is_err());
        assert_eq!(handshake.state(), HandshakeState::Idle);
        assert!(handshake.negotiate(&media).await.is_ok());
    }

    #[tokio::test]
    async fn test_completed_handshake_is_not_rerun() {
        let media = SharedMedia::new(ScriptedMedia::new().reply(IDENT).reply(IDENT));
        let mut handshake = IecHandshake::default();

        handshake.negotiate(&media).await.unwrap();
        assert!(matches!(
            handshake.negotiate(&media).await,
            Err(DlmsError::Protocol(_))
        ));
        assert_eq!(media.synchronous().await.send_count(), 2);
    }

    #[tokio::test]
    async fn test_custom_control_characters() {
        let media = SharedMedia::new(ScriptedMedia::new().reply(b"/ABC6XYZ\r\n".to_vec()));
        let mut handshake = IecHandshake::default().with_control_characters(b'0', b'0');

        handshake.negotiate(&media).await.unwrap();
        assert_eq!(
            media.synchronous().await.sent()[1],
            vec![0x06, b'0', b'6', b'0', 0x0D, 0x0A]
        );
    }

    #[test]
    fn test_parse_identification() {
        assert_eq!(
            IecHandshake::parse_identification(IDENT).unwrap(),
            BaudRate::B9600
        );
        assert!(matches!(
            IecHandshake::parse_identification(b"/ISK"),
            Err(DlmsError::InvalidHandshakeResponse(_))
        ));
        assert!(matches!(
            IecHandshake::parse_identification(b""),
            Err(DlmsError::InvalidHandshakeResponse(_))
        ));
        assert!(matches!(
            IecHandshake::parse_identification(b"/ISK9\r\n"),
            Err(DlmsError::UnknownBaudRate('9'))
        ));
    }
}
