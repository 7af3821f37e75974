//! `Media` on top of a raw byte stream

use crate::media::{LineSettings, Media, ReceiveParameters, SerialLine};
use crate::serial::SerialTransport;
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use bytes::BytesMut;
use dlms_core::{DlmsError, DlmsResult};
use tokio::time::Instant;

const READ_CHUNK: usize = 256;

/// Adapts a `TransportLayer` to the `Media` interface
///
/// Bytes that arrive after the end of a reply (with `all_data == false`)
/// or before a receive times out are kept and served first by the next
/// receive call. Sending drops them: whatever was left over belongs to an
/// earlier request.
#[derive(Debug)]
pub struct StreamMedia<T> {
    transport: T,
    pending: BytesMut,
}

impl<T: TransportLayer> StreamMedia<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: BytesMut::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bytes received but not yet handed out
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

#[async_trait]
impl<T: TransportLayer> Media for StreamMedia<T> {
    async fn open(&mut self) -> DlmsResult<()> {
        self.pending.clear();
        self.transport.open().await
    }

    async fn close(&mut self) -> DlmsResult<()> {
        self.pending.clear();
        self.transport.close().await
    }

    fn is_open(&self) -> bool {
        !self.transport.is_closed()
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        if !self.pending.is_empty() {
            log::debug!("Discarding {} stale bytes before send", self.pending.len());
            self.pending.clear();
        }
        log::trace!("TX: {:02X?}", data);
        self.transport.write_all(data).await
    }

    async fn receive(
        &mut self,
        params: &ReceiveParameters,
        reply: &mut BytesMut,
    ) -> DlmsResult<bool> {
        let deadline = Instant::now() + params.wait_time;
        let mut received = self.pending.split();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(end) = params.satisfied_by(&received) {
                if !params.all_data {
                    self.pending = received.split_off(end);
                }
                log::trace!("RX: {:02X?}", &received[..]);
                reply.extend_from_slice(&received);
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                self.pending = received;
                return Ok(false);
            }

            match self.transport.read_within(&mut chunk, deadline - now).await {
                Ok(0) => {
                    self.pending = received;
                    return Err(DlmsError::not_connected("Stream ended while receiving"));
                }
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(DlmsError::Timeout) => {
                    self.pending = received;
                    return Ok(false);
                }
                Err(e) => {
                    self.pending = received;
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl SerialLine for StreamMedia<SerialTransport> {
    fn line_settings(&self) -> LineSettings {
        self.transport.settings().line
    }

    async fn set_line_settings(&mut self, settings: LineSettings) -> DlmsResult<()> {
        self.transport.apply_line(settings)
    }
}
