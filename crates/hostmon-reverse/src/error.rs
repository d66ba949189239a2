use std::io;

/// Everything that can go wrong on the broker leg of the tunnel, plus the
/// two terminal conditions. Session-level errors tear down the connection
/// and are recovered by the supervisor; only configuration failures and
/// retry exhaustion surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ReverseError {
    #[error("configuring reverse connection: {0}")]
    Config(String),

    #[error("connecting to broker: {0}")]
    Dial(#[source] io::Error),

    #[error("writing intro: {0}")]
    IntroWrite(#[source] io::Error),

    #[error("short read, expected {expected} bytes, received {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("reading from broker: {0}")]
    Read(#[source] io::Error),

    #[error("oversized frame, payload length {0} exceeds 65529")]
    OversizeFrame(u32),

    #[error("writing to broker: {0}")]
    Write(#[source] io::Error),

    #[error("{attempts} failed connection attempts")]
    ExhaustedRetries { attempts: u32 },
}

/// Local-fetch failures never propagate out of the session loop; the broker
/// receives `{}` instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("connecting to local endpoint: {0}")]
    Dial(#[source] io::Error),

    #[error("reading local metric data: {0}")]
    Read(#[source] io::Error),
}

pub(crate) fn timeout_error() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed")
}
