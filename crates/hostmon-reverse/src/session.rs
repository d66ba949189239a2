use crate::error::ReverseError;
use crate::fetcher;
use crate::frame::{encode_frame, FrameHeader, HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::link::BrokerLink;
use tokio::io::{AsyncRead, AsyncWrite};

/// Drive one connected session until broker I/O fails. Commands and their
/// arguments arrive as separate frames, command first, so the loop keeps
/// both accumulators and only acts once a CONNECT has its argument. Local
/// fetch failures are absorbed: the broker always receives a valid JSON
/// payload on the originating channel.
///
/// Returns the error that ended the session; the supervisor decides what
/// happens next.
pub(crate) async fn run_session<S>(link: &mut BrokerLink<S>, agent_address: &str) -> ReverseError
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut cmd: Vec<u8> = Vec::new();
    let mut arg: Vec<u8> = Vec::new();

    loop {
        let hdr = match read_header(link).await {
            Ok(hdr) => hdr,
            Err(e) => return e,
        };

        if hdr.payload_len > MAX_PAYLOAD_LEN {
            // protocol desync, nothing downstream can be trusted
            tracing::warn!(
                payload_len = hdr.payload_len,
                "oversized frame, resetting connection"
            );
            return ReverseError::OversizeFrame(hdr.payload_len);
        }

        let payload = match link.read_exact(hdr.payload_len as usize).await {
            Ok(payload) => payload,
            Err(e) => return e,
        };

        if hdr.is_command {
            tracing::debug!(cmd = %String::from_utf8_lossy(&payload), "received command");
            cmd = payload;
        } else {
            tracing::debug!(len = payload.len(), "received request");
            arg = payload;
        }

        match cmd.as_slice() {
            b"CONNECT" => {
                // first time through the argument is still in flight
                if !arg.is_empty() {
                    let data = match fetcher::fetch_metrics(agent_address, &arg).await {
                        Ok(data) => data,
                        Err(e) => {
                            tracing::warn!(error = %e, "fetching local metric data");
                            b"{}".to_vec()
                        }
                    };
                    if let Err(e) = send_chunked(link, hdr.channel_id, &data).await {
                        return e;
                    }
                    tracing::debug!(
                        bytes = data.len(),
                        channel_id = hdr.channel_id,
                        "metric data sent"
                    );
                    cmd.clear();
                    arg.clear();
                }
            }
            // Whether these pertain to the local or the broker leg is
            // ambiguous in the protocol; ignore them and let subsequent
            // I/O errors drive teardown.
            b"CLOSE" | b"RESET" | b"SHUTDOWN" => cmd.clear(),
            other => {
                tracing::warn!(
                    cmd = %String::from_utf8_lossy(other),
                    channel_id = hdr.channel_id,
                    "unknown command"
                );
            }
        }
    }
}

async fn read_header<S>(link: &mut BrokerLink<S>) -> Result<FrameHeader, ReverseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let data = link.read_exact(HEADER_LEN).await?;
    FrameHeader::decode(&data)
}

/// Deliver `data` on `channel_id` in frames of at most `MAX_PAYLOAD_LEN`
/// bytes, contiguous and in order.
pub(crate) async fn send_chunked<S>(
    link: &mut BrokerLink<S>,
    channel_id: u16,
    data: &[u8],
) -> Result<(), ReverseError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut offset = 0;
    while offset < data.len() {
        let end = usize::min(offset + MAX_PAYLOAD_LEN as usize, data.len());
        link.write_all(&encode_frame(channel_id, &data[offset..end]))
            .await?;
        offset = end;
    }
    Ok(())
}
