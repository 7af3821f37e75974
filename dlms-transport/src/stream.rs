//! Byte stream traits implemented by physical transports

use async_trait::async_trait;
use dlms_core::{DlmsError, DlmsResult};
use std::time::Duration;

/// Raw access to the byte stream of a physical link to a meter
///
/// Implementations do no framing at all; `StreamMedia` builds the
/// end-of-packet aware receive on top of `read_within`.
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Read whatever is available, waiting at most `timeout`
    ///
    /// Returns the number of bytes read (0 means the stream ended). A wait
    /// that runs out fails with `DlmsError::Timeout`.
    async fn read_within(&mut self, buf: &mut [u8], timeout: Duration) -> DlmsResult<usize>;

    /// Write part of `buf`, returning how much was accepted
    async fn write(&mut self, buf: &[u8]) -> DlmsResult<usize>;

    /// Write the whole buffer and flush it to the line
    async fn write_all(&mut self, buf: &[u8]) -> DlmsResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(DlmsError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        self.flush().await
    }

    async fn flush(&mut self) -> DlmsResult<()>;

    fn is_closed(&self) -> bool;

    async fn close(&mut self) -> DlmsResult<()>;
}

/// A stream that can be (re)opened
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> DlmsResult<()>;
}
