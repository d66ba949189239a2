use crate::error::{timeout_error, ReverseError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Deadline for any single read or write against the broker.
pub(crate) const COMM_TIMEOUT: Duration = Duration::from_secs(65);

/// Deadline-bounded I/O over the established broker stream. A fresh
/// deadline is armed before every operation; reusing the connection across
/// loop iterations without re-arming is a known failure mode.
pub(crate) struct BrokerLink<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> BrokerLink<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Read exactly `n` bytes. A peer close or stall mid-message reports
    /// how many bytes actually arrived.
    pub(crate) async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ReverseError> {
        let mut buf = vec![0u8; n];
        let mut got = 0;
        while got < n {
            let read = timeout(COMM_TIMEOUT, self.stream.read(&mut buf[got..]))
                .await
                .map_err(|_| ReverseError::Read(timeout_error()))?
                .map_err(ReverseError::Read)?;
            if read == 0 {
                return Err(ReverseError::ShortRead { expected: n, got });
            }
            got += read;
        }
        Ok(buf)
    }

    /// Write the whole buffer. Short writes are not retried beyond what the
    /// stream itself does; they surface as write errors.
    pub(crate) async fn write_all(&mut self, data: &[u8]) -> Result<(), ReverseError> {
        timeout(COMM_TIMEOUT, self.stream.write_all(data))
            .await
            .map_err(|_| ReverseError::Write(timeout_error()))?
            .map_err(ReverseError::Write)
    }
}
