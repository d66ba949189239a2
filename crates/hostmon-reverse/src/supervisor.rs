use crate::config::{agent_address, configure, ReverseConfig, ReverseUrl};
use crate::error::{timeout_error, ReverseError};
use crate::link::{BrokerLink, COMM_TIMEOUT};
use crate::session;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// Establishing the TCP+TLS connection to the broker.
const DIALER_TIMEOUT: Duration = Duration::from_secs(15);

/// Backoff schedule for consecutive failures; the final entry repeats.
const BACKOFF: [Duration; 7] = [
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(6),
    Duration::from_secs(8),
    Duration::from_secs(16),
    Duration::from_secs(32),
    Duration::from_secs(60),
];

/// Every Nth consecutive failure forces a reconfiguration before the next
/// dial. Broker IP changes, check re-targeting and broker certificate
/// rotation all invalidate the cached URL and TLS material, and the session
/// cannot recover without a fresh configurator run.
const RECONFIG_EVERY: u32 = 5;

/// What the supervisor does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextStep {
    Retry { delay: Duration, reconfigure: bool },
    GiveUp,
}

/// Attempt counting and backoff for consecutive connection failures.
/// `max_conn_retry == 0` retries forever.
#[derive(Debug)]
pub(crate) struct RetryPolicy {
    attempt: u32,
    max_conn_retry: u32,
}

impl RetryPolicy {
    pub(crate) fn new(max_conn_retry: u32) -> Self {
        Self {
            attempt: 1,
            max_conn_retry,
        }
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset on any successful session establishment.
    pub(crate) fn established(&mut self) {
        self.attempt = 1;
    }

    /// Record a failed attempt and decide what happens next.
    pub(crate) fn failed(&mut self) -> NextStep {
        if self.max_conn_retry != 0 && self.attempt >= self.max_conn_retry {
            return NextStep::GiveUp;
        }
        let delay = BACKOFF[usize::min(self.attempt as usize - 1, BACKOFF.len() - 1)];
        self.attempt += 1;
        NextStep::Retry {
            delay,
            reconfigure: self.attempt % RECONFIG_EVERY == 0,
        }
    }
}

/// Run the reverse client until a terminal error. Returns `Ok` immediately
/// when reverse is disabled in configuration; otherwise only
/// [`ReverseError::Config`] and [`ReverseError::ExhaustedRetries`] end it.
pub async fn run(cfg: ReverseConfig) -> Result<(), ReverseError> {
    if !cfg.enabled {
        tracing::info!("reverse disabled, not starting");
        return Ok(());
    }
    tracing::info!("setting up reverse connection");

    let agent_addr = agent_address(&cfg.listen_address);
    let (mut reverse_url, mut tls_config) = configure(&cfg)?;
    tracing::info!(
        check_id = %cfg.check_id,
        broker = %reverse_url,
        agent = %agent_addr,
        "reverse configuration"
    );

    let mut retry = RetryPolicy::new(cfg.max_conn_retry);
    loop {
        match connect(&reverse_url, tls_config.clone()).await {
            Ok(stream) => {
                retry.established();
                let mut link = BrokerLink::new(stream);
                let err = session::run_session(&mut link, &agent_addr).await;
                tracing::warn!(error = %err, "session ended");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempt = retry.attempt(),
                    "connection attempt failed"
                );
            }
        }

        match retry.failed() {
            NextStep::GiveUp => {
                return Err(ReverseError::ExhaustedRetries {
                    attempts: retry.attempt(),
                });
            }
            NextStep::Retry { delay, reconfigure } => {
                tracing::info!(
                    delay_secs = delay.as_secs(),
                    attempt = retry.attempt(),
                    "connect retry"
                );
                sleep(delay).await;
                if reconfigure {
                    tracing::info!(attempt = retry.attempt(), "reconfig triggered");
                    (reverse_url, tls_config) = configure(&cfg)?;
                }
            }
        }
    }
}

/// Dial the broker, complete the TLS handshake and write the introduction
/// line. Any failure here counts as a failed attempt.
async fn connect(
    reverse_url: &ReverseUrl,
    tls_config: Arc<ClientConfig>,
) -> Result<TlsStream<TcpStream>, ReverseError> {
    tracing::info!(host = %reverse_url.host, port = reverse_url.port, "connecting");

    let addr = format!("{}:{}", reverse_url.host, reverse_url.port);
    let server_name = rustls::pki_types::ServerName::try_from(reverse_url.host.clone())
        .map_err(|e| ReverseError::Config(format!("invalid broker host name: {e}")))?;
    let connector = TlsConnector::from(tls_config);

    // one dial budget for TCP connect and TLS handshake together
    let mut stream = timeout(DIALER_TIMEOUT, async {
        let tcp = TcpStream::connect(&addr).await?;
        connector.connect(server_name, tcp).await
    })
    .await
    .map_err(|_| ReverseError::Dial(timeout_error()))?
    .map_err(ReverseError::Dial)?;

    // The fragment carries the reverse secret, so log the path only.
    tracing::debug!(path = %reverse_url.path, "sending intro");
    timeout(COMM_TIMEOUT, stream.write_all(reverse_url.intro_line().as_bytes()))
        .await
        .map_err(|_| ReverseError::IntroWrite(timeout_error()))?
        .map_err(ReverseError::IntroWrite)?;

    Ok(stream)
}
