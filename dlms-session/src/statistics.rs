//! Packet exchange statistics

/// Counters kept by a `PacketExchange`
///
/// Useful for spotting a flaky optical head or a device that is slow to
/// wake: a high `retries` count next to a low `timeouts` count means the
/// first request was often lost but the retry got through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExchangeStatistics {
    /// Exchanges started (empty requests are not counted)
    pub exchanges: u64,
    /// Exchanges that returned a frame
    pub completed: u64,
    /// Requests put on the line, retries included
    pub requests_sent: u64,
    /// Requests sent again because no reply arrived
    pub retries: u64,
    /// Extra receives needed to complete a frame
    pub reassembly_receives: u64,
    /// Receives that ran out of time
    pub timeouts: u64,
    /// Frames that carried a nonzero error code
    pub protocol_errors: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl ExchangeStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_send(&mut self, len: usize) {
        self.requests_sent += 1;
        self.bytes_sent += len as u64;
    }

    /// Share of exchanges that failed, in percent
    pub fn failure_rate(&self) -> f64 {
        if self.exchanges == 0 {
            0.0
        } else {
            let failed = self.exchanges.saturating_sub(self.completed);
            (failed as f64 / self.exchanges as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let mut stats = ExchangeStatistics::new();
        assert_eq!(stats.failure_rate(), 0.0);
        stats.exchanges = 4;
        stats.completed = 3;
        assert_eq!(stats.failure_rate(), 25.0);
        stats.clear();
        assert_eq!(stats, ExchangeStatistics::default());
    }
}
