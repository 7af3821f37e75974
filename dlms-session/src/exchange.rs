//! Packet exchange engine
//!
//! One call to [`PacketExchange::exchange`] is one request/response cycle:
//!
//! 1. Take the media guard; it stays held until the call returns.
//! 2. Send the request and wait for a reply. No reply within the wait time
//!    means the request (or the reply) was lost, so the request is sent
//!    again, up to [`MAX_SEND_ATTEMPTS`] times in total.
//! 3. Once bytes arrive, keep receiving without resending until the oracle
//!    reports a complete frame. A reply that stalls mid-frame fails at
//!    once: resending then would desynchronise a device that is halfway
//!    through its answer.
//! 4. Fail with the frame's error code if it carries one.

use crate::interface::InterfaceType;
use crate::oracle::FrameOracle;
use crate::statistics::ExchangeStatistics;
use bytes::{Bytes, BytesMut};
use dlms_core::{DlmsError, DlmsResult};
use dlms_transport::{Media, ReceiveParameters, SharedMedia};
use std::ops::Deref;
use std::time::Duration;

/// Number of times a request is sent before giving up on a reply
pub const MAX_SEND_ATTEMPTS: u8 = 3;

/// Bytes of one reply, accumulated across physical receives
///
/// Every exchange starts from a fresh, empty buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    data: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }
}

impl Deref for FrameBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Drives request/response cycles over a shared media
#[derive(Debug)]
pub struct PacketExchange<M> {
    media: SharedMedia<M>,
    params: ReceiveParameters,
    statistics: ExchangeStatistics,
}

impl<M: Media> PacketExchange<M> {
    pub fn new(media: SharedMedia<M>, params: ReceiveParameters) -> Self {
        Self {
            media,
            params,
            statistics: ExchangeStatistics::new(),
        }
    }

    /// Engine using the receive parameters of `interface`
    pub fn for_interface(
        media: SharedMedia<M>,
        interface: InterfaceType,
        wait_time: Duration,
    ) -> Self {
        Self::new(media, interface.receive_parameters(wait_time))
    }

    pub fn media(&self) -> &SharedMedia<M> {
        &self.media
    }

    pub fn receive_parameters(&self) -> &ReceiveParameters {
        &self.params
    }

    pub fn statistics(&self) -> &ExchangeStatistics {
        &self.statistics
    }

    pub fn clear_statistics(&mut self) {
        self.statistics.clear();
    }

    /// Send `request` and return the complete reply frame
    ///
    /// An empty request is a no-op: nothing is sent, nothing is awaited and
    /// an empty buffer is returned.
    ///
    /// # Errors
    /// - `DlmsError::TransportTimeout` when no reply arrived after
    ///   [`MAX_SEND_ATTEMPTS`] sends, or a partial reply stalled
    /// - `DlmsError::ProtocolError(code)` when the complete frame carries a
    ///   nonzero error code
    /// - any error of the media itself
    pub async fn exchange<O>(&mut self, request: &[u8], oracle: &O) -> DlmsResult<FrameBuffer>
    where
        O: FrameOracle + ?Sized,
    {
        if request.is_empty() {
            return Ok(FrameBuffer::new());
        }

        let mut media = self.media.synchronous().await;
        self.statistics.exchanges += 1;
        let mut reply = FrameBuffer::new();

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            log::debug!("Sending {} bytes (attempt {})", request.len(), attempt);
            media.send(request).await?;
            self.statistics.record_send(request.len());

            if media.receive(&self.params, reply.buffer_mut()).await? {
                break;
            }

            self.statistics.timeouts += 1;
            if attempt >= MAX_SEND_ATTEMPTS {
                log::warn!(
                    "No reply within {:?} after {} attempts",
                    self.params.wait_time,
                    attempt
                );
                return Err(DlmsError::TransportTimeout);
            }
            self.statistics.retries += 1;
            log::warn!(
                "No reply within {:?}, resending ({}/{})",
                self.params.wait_time,
                attempt + 1,
                MAX_SEND_ATTEMPTS
            );
        }

        while !oracle.is_frame_complete(&reply) {
            self.statistics.reassembly_receives += 1;
            log::debug!("Frame incomplete after {} bytes, receiving more", reply.len());
            if !media.receive(&self.params, reply.buffer_mut()).await? {
                self.statistics.timeouts += 1;
                log::warn!("Reply stalled after {} bytes", reply.len());
                return Err(DlmsError::TransportTimeout);
            }
        }
        self.statistics.bytes_received += reply.len() as u64;

        let code = oracle.extract_error_code(&reply);
        if code != 0 {
            self.statistics.protocol_errors += 1;
            log::warn!("Device reported error code {}", code);
            return Err(DlmsError::ProtocolError(code));
        }

        self.statistics.completed += 1;
        Ok(reply)
    }
}
