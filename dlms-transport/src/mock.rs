//! Scripted in-memory media and byte stream
//!
//! Each `receive` (or `read_within`) consumes the next scripted outcome.
//! Everything sent is recorded so tests can check exactly what went on the
//! line.

use crate::media::{LineSettings, Media, ReceiveParameters, SerialLine};
use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use bytes::BytesMut;
use dlms_core::{DlmsError, DlmsResult};
use std::collections::VecDeque;
use std::time::Duration;

/// One scripted answer to a `receive` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Data(Vec<u8>),
    Timeout,
}

#[derive(Debug, Default)]
pub struct ScriptedMedia {
    replies: VecDeque<ScriptedReply>,
    sent: Vec<Vec<u8>>,
    receives: usize,
    open: bool,
    opens: usize,
    fail_open: bool,
    line: LineSettings,
    line_history: Vec<LineSettings>,
    last_params: Option<ReceiveParameters>,
}

impl ScriptedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply chunk
    pub fn reply(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.replies.push_back(ScriptedReply::Data(data.into()));
        self
    }

    /// Queue a receive that runs out of time
    pub fn timeout(mut self) -> Self {
        self.replies.push_back(ScriptedReply::Timeout);
        self
    }

    /// Make `open` fail
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn send_count(&self) -> usize {
        self.sent.len()
    }

    pub fn receive_count(&self) -> usize {
        self.receives
    }

    pub fn open_count(&self) -> usize {
        self.opens
    }

    /// Every line setting applied, in order
    pub fn line_history(&self) -> &[LineSettings] {
        &self.line_history
    }

    pub fn last_params(&self) -> Option<&ReceiveParameters> {
        self.last_params.as_ref()
    }

    /// Scripted outcomes not consumed yet
    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl Media for ScriptedMedia {
    async fn open(&mut self) -> DlmsResult<()> {
        if self.fail_open {
            return Err(DlmsError::not_connected("Scripted open failure"));
        }
        self.opens += 1;
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(
        &mut self,
        params: &ReceiveParameters,
        reply: &mut BytesMut,
    ) -> DlmsResult<bool> {
        self.receives += 1;
        self.last_params = Some(params.clone());
        match self.replies.pop_front() {
            Some(ScriptedReply::Data(data)) => {
                reply.extend_from_slice(&data);
                Ok(true)
            }
            Some(ScriptedReply::Timeout) | None => Ok(false),
        }
    }
}

#[async_trait]
impl SerialLine for ScriptedMedia {
    fn line_settings(&self) -> LineSettings {
        self.line
    }

    async fn set_line_settings(&mut self, settings: LineSettings) -> DlmsResult<()> {
        self.line = settings;
        self.line_history.push(settings);
        Ok(())
    }
}

/// Byte stream handing out scripted read chunks
///
/// A scripted timeout (or an exhausted script) waits the full read timeout
/// and fails with `DlmsError::Timeout`, so use it with paused time.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    reads: VecDeque<ScriptedReply>,
    written: Vec<u8>,
    writes: usize,
    closed: bool,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk returned by one read
    pub fn chunk(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.reads.push_back(ScriptedReply::Data(data.into()));
        self
    }

    /// Queue a read that runs out of time
    pub fn timeout(mut self) -> Self {
        self.reads.push_back(ScriptedReply::Timeout);
        self
    }

    /// All bytes written, concatenated
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }
}

#[async_trait]
impl StreamAccessor for ScriptedStream {
    async fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> DlmsResult<usize> {
        match self.reads.pop_front() {
            Some(ScriptedReply::Data(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.reads.push_front(ScriptedReply::Data(chunk[n..].to_vec()));
                }
                Ok(n)
            }
            Some(ScriptedReply::Timeout) | None => {
                tokio::time::sleep(timeout).await;
                Err(DlmsError::Timeout)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> DlmsResult<usize> {
        self.writes += 1;
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> DlmsResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> DlmsResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[async_trait]
impl TransportLayer for ScriptedStream {
    async fn open(&mut self) -> DlmsResult<()> {
        self.closed = false;
        Ok(())
    }
}
