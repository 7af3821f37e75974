//! Session with one device over a serial line
//!
//! # Connection Flow
//!
//! 1. **Line**: run the IEC 62056-21 negotiation and switch the line to the
//!    negotiated speed, or open the line at the configured speed
//! 2. **Connect**: send the producer's connect request, if it has one
//! 3. **Associate**: send every association request, parse the last reply
//! 4. **Ready**: data requests go through the packet exchange engine
//!
//! Every request of every step goes through the same `PacketExchange`, so
//! the send retries and reassembly rules hold for all of them.

use super::config::SessionConfig;
use super::connection::{MessageProducer, SessionState};
use dlms_core::{DlmsError, DlmsResult};
use dlms_session::{
    ExchangeStatistics, FrameBuffer, FrameOracle, IecHandshake, NegotiatedBaud, PacketExchange,
    error_code,
};
use dlms_transport::{
    LineSettings, Media, SerialLine, SerialTransport, SharedMedia, StreamMedia,
};

/// Session over the system serial port
pub type SerialSession<P> = Session<StreamMedia<SerialTransport>, P>;

/// Session with one device
pub struct Session<M, P> {
    config: SessionConfig,
    media: SharedMedia<M>,
    exchange: PacketExchange<M>,
    oracle: Box<dyn FrameOracle + Send + Sync>,
    producer: P,
    state: SessionState,
    negotiated: Option<NegotiatedBaud>,
}

impl<M, P> Session<M, P>
where
    M: Media + SerialLine,
    P: MessageProducer,
{
    pub fn new(config: SessionConfig, media: M, producer: P) -> Self {
        let media = SharedMedia::new(media);
        let exchange = PacketExchange::for_interface(
            media.clone(),
            config.interface_type,
            config.wait_time,
        );
        Self {
            oracle: config.interface_type.frame_oracle(),
            config,
            media,
            exchange,
            producer,
            state: SessionState::Closed,
            negotiated: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_ready()
    }

    /// Result of the IEC negotiation of the last `open()`, if it ran
    pub fn negotiated_baud(&self) -> Option<&NegotiatedBaud> {
        self.negotiated.as_ref()
    }

    pub fn media(&self) -> &SharedMedia<M> {
        &self.media
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn producer_mut(&mut self) -> &mut P {
        &mut self.producer
    }

    pub fn statistics(&self) -> &ExchangeStatistics {
        self.exchange.statistics()
    }

    /// Open the line, connect and associate
    ///
    /// On failure the line is closed again and the session stays `Closed`.
    pub async fn open(&mut self) -> DlmsResult<()> {
        if self.state.can_close() {
            return Err(DlmsError::Protocol(format!(
                "Session already open (state {})",
                self.state.as_str()
            )));
        }

        if let Err(e) = self.establish().await {
            log::warn!("Opening session on {} failed: {}", self.config.port_name, e);
            if let Err(close_error) = self.media.synchronous().await.close().await {
                log::debug!("Closing media after failed open: {}", close_error);
            }
            self.state = SessionState::Closed;
            return Err(e);
        }
        log::info!("Session on {} ready", self.config.port_name);
        Ok(())
    }

    async fn establish(&mut self) -> DlmsResult<()> {
        self.open_line().await?;
        self.state = SessionState::Negotiated;

        let connect = self.producer.connect_request();
        if connect.is_empty() {
            log::debug!("No connect request for {:?}", self.config.interface_type);
        } else {
            let reply = self.exchange.exchange(&connect, self.oracle.as_ref()).await?;
            self.producer.parse_connect_response(&reply)?;
        }
        self.state = SessionState::Connected;

        let mut last_reply = None;
        for request in self.producer.associate_requests()? {
            last_reply = Some(self.exchange.exchange(&request, self.oracle.as_ref()).await?);
        }
        if let Some(reply) = last_reply {
            self.producer.parse_associate_response(&reply)?;
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn open_line(&mut self) -> DlmsResult<()> {
        let baud_rate = if self.config.initialize_iec {
            let mut handshake = IecHandshake::new(self.config.wait_time).with_control_characters(
                self.config.control_character,
                self.config.mode_control_character,
            );
            let negotiated = handshake.negotiate(&self.media).await?;
            let baud_rate = negotiated.baud_rate().bits_per_second();
            self.negotiated = Some(negotiated);
            // the device needs time to switch before it listens at the new speed
            tokio::time::sleep(self.config.switch_delay).await;
            baud_rate
        } else {
            self.negotiated = None;
            self.config.baud_rate
        };

        let mut media = self.media.synchronous().await;
        media.set_line_settings(LineSettings::binary(baud_rate)).await?;
        if !media.is_open() {
            media.open().await?;
        }
        log::info!("Line {} at {} baud 8N1", self.config.port_name, baud_rate);
        Ok(())
    }

    /// Send one data request and return the complete reply frame
    pub async fn request(&mut self, data: &[u8]) -> DlmsResult<FrameBuffer> {
        if !self.state.is_ready() {
            return Err(DlmsError::not_connected("Session is not open"));
        }
        self.exchange.exchange(data, self.oracle.as_ref()).await
    }

    /// Disconnect and close the line
    ///
    /// The line is closed even when the disconnect fails; that failure is
    /// returned afterwards. A device answering the disconnect with DM was
    /// already disconnected, which counts as success.
    pub async fn close(&mut self) -> DlmsResult<()> {
        let mut result = Ok(());
        if self.state.is_ready() {
            let disconnect = self.producer.disconnect_request();
            match self.exchange.exchange(&disconnect, self.oracle.as_ref()).await {
                Ok(_) => {}
                Err(DlmsError::ProtocolError(error_code::DISCONNECT_MODE)) => {
                    log::info!("Device was already disconnected");
                }
                Err(e) if e.is_timeout() => {
                    log::warn!("Device did not answer the disconnect request");
                    result = Err(e);
                }
                Err(e) => {
                    log::warn!("Disconnect failed: {}", e);
                    result = Err(e);
                }
            }
            log::debug!(
                "Exchange failure rate {:.1}% over {} exchanges",
                self.exchange.statistics().failure_rate(),
                self.exchange.statistics().exchanges
            );
        }

        let closed = self.media.synchronous().await.close().await;
        self.state = SessionState::Closed;
        log::info!("Session on {} closed", self.config.port_name);
        result.and(closed)
    }
}
