use crate::error::{timeout_error, FetchError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Establishing the TCP connection to the local endpoint.
const DIALER_TIMEOUT: Duration = Duration::from_secs(15);

/// Total budget for one metric transaction. The endpoint is local; a
/// complete round trip should take far less than the broker's polling
/// interval, gated only by plugin execution speed.
const METRIC_TIMEOUT: Duration = Duration::from_secs(50);

/// Forward `request` verbatim to the local metric endpoint and return its
/// response, read to EOF. The request bytes come straight off the tunnel
/// (an HTTP request line plus headers); this layer is deliberately
/// protocol-agnostic.
pub(crate) async fn fetch_metrics(
    agent_address: &str,
    request: &[u8],
) -> Result<Vec<u8>, FetchError> {
    let mut stream = timeout(DIALER_TIMEOUT, TcpStream::connect(agent_address))
        .await
        .map_err(|_| FetchError::Dial(timeout_error()))?
        .map_err(FetchError::Dial)?;

    let transaction = async {
        let written = stream.write(request).await?;
        if written < request.len() {
            // the endpoint may still answer what it got
            tracing::warn!(
                written,
                request_len = request.len(),
                "short write to local endpoint"
            );
        }
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;
        Ok::<_, std::io::Error>(data)
    };

    timeout(METRIC_TIMEOUT, transaction)
        .await
        .map_err(|_| FetchError::Read(timeout_error()))?
        .map_err(FetchError::Read)
}
