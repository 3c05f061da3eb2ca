//! Raw CONNECT exchange with a candidate proxy
//!
//! One fresh TCP connection per probe: connect, send the pre-built request, read once,
//! drop the stream.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::error::ProbeError;
use crate::models::format_authority;
use crate::probe::status::parse_status_code;

/// Capacity of the single receive.
///
/// The proxy's reply is read once into a buffer of this size; more pending data is ignored.
/// A status line that does not start within these bytes cannot be parsed and the proxy is
/// reported unavailable. This bounds memory and latency per probe.
pub const RESPONSE_BUFFER_SIZE: usize = 150;

/// Deadlines applied to a probe. `None` waits indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// Bounds name resolution plus TCP connect
    pub connect: Option<Duration>,
    /// Bounds the send and, separately, the single receive
    pub read: Option<Duration>,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            connect: Some(Duration::from_secs(10)),
            read: Some(Duration::from_secs(10)),
        }
    }
}

impl ProbeTimeouts {
    /// No deadlines at all; a silent proxy blocks the probe forever
    pub fn unbounded() -> Self {
        Self {
            connect: None,
            read: None,
        }
    }
}

/// Tunnel transport
pub struct TunnelTransport;

impl TunnelTransport {
    /// Send `request` to the proxy and parse the status code of its reply
    #[instrument(skip_all, fields(proxy = %format_authority(proxy_host, proxy_port)))]
    pub async fn probe_status(
        proxy_host: &str,
        proxy_port: u16,
        request: &str,
        timeouts: ProbeTimeouts,
    ) -> Result<StatusCode, ProbeError> {
        let stream = with_deadline(
            timeouts.connect,
            "connect",
            Self::connect_ipv4(proxy_host, proxy_port),
        )
        .await?;

        Self::exchange(stream, request, timeouts.read).await
    }

    /// Resolve the proxy host and connect to the first IPv4 address that accepts
    async fn connect_ipv4(host: &str, port: u16) -> Result<TcpStream, ProbeError> {
        let addrs = lookup_host((host, port))
            .await
            .map_err(|e| ProbeError::Connect(format!("failed to resolve {}: {}", host, e)))?;

        let mut last_error = None;
        for addr in addrs.filter(SocketAddr::is_ipv4) {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!("Connected to proxy at {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("TCP connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => ProbeError::Connect(format!("TCP connect failed: {}", e)),
            None => ProbeError::Connect(format!("no IPv4 address for {}", host)),
        })
    }

    /// Write the request and parse the status from a single bounded read.
    ///
    /// Takes the stream by value so it is closed when this returns.
    pub async fn exchange<S>(
        mut stream: S,
        request: &str,
        deadline: Option<Duration>,
    ) -> Result<StatusCode, ProbeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        with_deadline(deadline, "send", async {
            stream
                .write_all(request.as_bytes())
                .await
                .map_err(|e| ProbeError::Send(e.to_string()))
        })
        .await?;

        let mut response = [0u8; RESPONSE_BUFFER_SIZE];
        let n = with_deadline(deadline, "read", async {
            stream
                .read(&mut response)
                .await
                .map_err(|e| ProbeError::Receive(e.to_string()))
        })
        .await?;

        if n == 0 {
            return Err(ProbeError::Receive(
                "connection closed before any response".into(),
            ));
        }

        debug!("Read {} bytes of CONNECT response", n);
        parse_status_code(&response[..n])
    }
}

async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    phase: &'static str,
    fut: F,
) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match deadline {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| ProbeError::Timeout(phase))?,
        None => fut.await,
    }
}
