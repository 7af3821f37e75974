//! Media interface used by the packet exchange engine and the IEC handshake
//!
//! A `Media` is a half-duplex channel to exactly one device. It knows how to
//! send bytes and how to wait for a reply described by `ReceiveParameters`;
//! it knows nothing about frames. Callers share it through `SharedMedia`,
//! whose guard must be held for a whole logical exchange.

use async_trait::async_trait;
use bytes::BytesMut;
use dlms_core::DlmsResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio_serial::{DataBits, Parity, StopBits};

/// Speed the IEC 62056-21 opening sequence always starts at
pub const IEC_INITIAL_BAUD_RATE: u32 = 300;

/// How to wait for incoming bytes in a single `Media::receive` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveParameters {
    /// End-of-packet marker; `None` means the reply has no terminator and
    /// only `count` decides when the receive is satisfied
    pub eop: Option<u8>,
    /// Minimum number of bytes this receive has to collect
    pub count: usize,
    /// Upper bound on the wait of one receive call
    pub wait_time: Duration,
    /// Keep every byte read (`true`) or cut the reply right after the
    /// marker and hold the rest back for the next receive (`false`)
    pub all_data: bool,
}

impl ReceiveParameters {
    /// Parameters for a reply terminated by `eop`
    pub fn until(eop: u8, wait_time: Duration) -> Self {
        Self {
            eop: Some(eop),
            count: 0,
            wait_time,
            all_data: false,
        }
    }

    /// Parameters for a reply of at least `count` bytes with no terminator
    pub fn at_least(count: usize, wait_time: Duration) -> Self {
        Self {
            eop: None,
            count,
            wait_time,
            all_data: true,
        }
    }

    /// Returns the end offset of a satisfied reply within `received`
    ///
    /// With a marker, the reply ends at the first marker that leaves at
    /// least `count` bytes before (and including) it. Without one, the
    /// reply is everything once `count` bytes are there.
    pub fn satisfied_by(&self, received: &[u8]) -> Option<usize> {
        if received.is_empty() {
            return None;
        }
        match self.eop {
            Some(eop) => {
                let skip = self.count.saturating_sub(1);
                received
                    .iter()
                    .skip(skip)
                    .position(|&b| b == eop)
                    .map(|pos| skip + pos + 1)
            }
            None if received.len() >= self.count => Some(received.len()),
            None => None,
        }
    }
}

impl Default for ReceiveParameters {
    fn default() -> Self {
        Self {
            eop: None,
            count: 0,
            wait_time: Duration::from_secs(9),
            all_data: false,
        }
    }
}

/// Character framing of a serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl LineSettings {
    /// 300 baud, 7 data bits, even parity, one stop bit
    pub fn iec_initial() -> Self {
        Self {
            baud_rate: IEC_INITIAL_BAUD_RATE,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::One,
        }
    }

    /// 8 data bits, no parity, one stop bit, used once binary framing starts
    pub fn binary(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self::binary(9600)
    }
}

/// A half-duplex channel to one device
#[async_trait]
pub trait Media: Send {
    async fn open(&mut self) -> DlmsResult<()>;

    async fn close(&mut self) -> DlmsResult<()>;

    fn is_open(&self) -> bool;

    /// Put `data` on the line
    async fn send(&mut self, data: &[u8]) -> DlmsResult<()>;

    /// Wait for a reply described by `params` and append it to `reply`
    ///
    /// Returns `Ok(false)` when nothing satisfying `params` arrived within
    /// `params.wait_time`. Errors are reserved for a broken channel.
    async fn receive(&mut self, params: &ReceiveParameters, reply: &mut BytesMut)
    -> DlmsResult<bool>;
}

/// A media whose character framing can be changed, needed by the IEC
/// speed negotiation
#[async_trait]
pub trait SerialLine: Send {
    fn line_settings(&self) -> LineSettings;

    /// Apply new settings; takes effect immediately when the line is open
    async fn set_line_settings(&mut self, settings: LineSettings) -> DlmsResult<()>;
}

/// A media shared between callers
///
/// `synchronous()` hands out the exclusive-access guard. Whoever holds it
/// owns the channel until the guard is dropped, which happens on every
/// exit path of the holder.
#[derive(Debug)]
pub struct SharedMedia<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for SharedMedia<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Media> SharedMedia<M> {
    pub fn new(media: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(media)),
        }
    }

    /// Wait for and take exclusive access to the media
    pub async fn synchronous(&self) -> MutexGuard<'_, M> {
        self.inner.lock().await
    }

    /// Take exclusive access only if nobody holds it right now
    pub fn try_synchronous(&self) -> Option<MutexGuard<'_, M>> {
        self.inner.try_lock().ok()
    }
}

impl<M: Media> From<M> for SharedMedia<M> {
    fn from(media: M) -> Self {
        Self::new(media)
    }
}
