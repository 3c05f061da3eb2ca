//! Proxy availability validation
//!
//! A proxy is available when it answers a CONNECT request for the configured target with
//! `200`. Every other outcome, including network and parse failures, makes it unavailable.

use async_trait::async_trait;
use http::StatusCode;
use tracing::{debug, error, instrument, warn};

use crate::config::ValidatorConfig;
use crate::error::{Error, ProbeError, Result};
use crate::models::{ProxyDescriptor, TargetAddress};
use crate::probe::request::build_connect_request;
use crate::probe::transport::{ProbeTimeouts, TunnelTransport};

/// Target used when none is configured
pub const DEFAULT_TARGET_URL: &str = "https://www.google.com";

/// Outcome of validating one proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The proxy opened the tunnel
    Available,
    /// The proxy answered with a status other than 200
    Rejected(StatusCode),
    /// No status could be obtained
    Failed(ProbeError),
    /// The descriptor itself cannot be probed (empty host, port 0)
    InvalidProxy(String),
}

impl Validation {
    pub fn from_probe(result: std::result::Result<StatusCode, ProbeError>) -> Self {
        match result {
            Ok(status) if status == StatusCode::OK => Validation::Available,
            Ok(status) => Validation::Rejected(status),
            Err(e) => Validation::Failed(e),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Validation::Available)
    }

    /// Status code returned by the proxy, if one was parsed
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Validation::Available => Some(StatusCode::OK),
            Validation::Rejected(status) => Some(*status),
            Validation::Failed(_) | Validation::InvalidProxy(_) => None,
        }
    }

    /// Human-readable reason for an unavailable verdict
    pub fn reason(&self) -> Option<String> {
        match self {
            Validation::Available => None,
            Validation::Rejected(status) => Some(format!("tunnel refused with {}", status)),
            Validation::Failed(e) => Some(e.to_string()),
            Validation::InvalidProxy(msg) => Some(msg.clone()),
        }
    }
}

/// Capability to decide whether a proxy can be put into rotation
#[async_trait]
pub trait ProxyValidator: Send + Sync {
    /// Validate a proxy, keeping the reason for an unavailable verdict
    async fn validate(&self, proxy: &ProxyDescriptor) -> Validation;

    /// Check whether the proxy is usable. Never fails; failures read as `false`.
    async fn is_available(&self, proxy: &ProxyDescriptor) -> bool {
        self.validate(proxy).await.is_available()
    }
}

/// Validates proxies by opening an HTTP CONNECT tunnel to a fixed target
#[derive(Debug, Clone)]
pub struct TunnelValidator {
    target: TargetAddress,
    timeouts: ProbeTimeouts,
}

impl TunnelValidator {
    /// Create a validator for `target_url` with default timeouts
    ///
    /// Fails with [`Error::InvalidConfig`] if the URL is empty, malformed, or has no host or
    /// port.
    pub fn new(target_url: &str) -> Result<Self> {
        Ok(Self {
            target: TargetAddress::from_url(target_url)?,
            timeouts: ProbeTimeouts::default(),
        })
    }

    /// Create a validator from loaded configuration
    pub fn with_config(config: &ValidatorConfig) -> Result<Self> {
        Ok(Self::new(&config.target_url)?.with_timeouts(config.timeouts()))
    }

    pub fn with_timeouts(mut self, timeouts: ProbeTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn target(&self) -> &TargetAddress {
        &self.target
    }

    pub fn timeouts(&self) -> ProbeTimeouts {
        self.timeouts
    }

    /// Blocking variant of [`ProxyValidator::is_available`] for callers outside a runtime.
    ///
    /// Runs the validation on a private current-thread runtime. Called from within an async
    /// context it logs an error and returns `false`; await [`ProxyValidator::is_available`]
    /// there instead.
    pub fn is_available_blocking(&self, proxy: &ProxyDescriptor) -> bool {
        if tokio::runtime::Handle::try_current().is_ok() {
            error!(
                "is_available_blocking called from within a Tokio runtime; not validating proxy {}",
                proxy
            );
            return false;
        }

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to start runtime for proxy validation: {}", e);
                return false;
            }
        };

        runtime.block_on(self.is_available(proxy))
    }

    fn build_request(&self, proxy: &ProxyDescriptor) -> Result<String> {
        if proxy.port == 0 {
            return Err(Error::InvalidArgument("proxy port must not be 0".into()));
        }
        build_connect_request(
            &proxy.host,
            &self.target,
            proxy.username(),
            proxy.password(),
        )
    }
}

impl Default for TunnelValidator {
    fn default() -> Self {
        Self {
            target: TargetAddress::from_url(DEFAULT_TARGET_URL)
                .expect("DEFAULT_TARGET_URL is a valid target URL"),
            timeouts: ProbeTimeouts::default(),
        }
    }
}

#[async_trait]
impl ProxyValidator for TunnelValidator {
    #[instrument(skip_all, fields(proxy = %proxy, target = %self.target))]
    async fn validate(&self, proxy: &ProxyDescriptor) -> Validation {
        let request = match self.build_request(proxy) {
            Ok(request) => request,
            Err(e) => {
                error!("Refusing to probe proxy {}: {}", proxy, e);
                return Validation::InvalidProxy(e.to_string());
            }
        };

        let result =
            TunnelTransport::probe_status(&proxy.host, proxy.port, &request, self.timeouts).await;
        let validation = Validation::from_probe(result);

        match validation.reason() {
            None => debug!("Proxy {} is available", proxy),
            Some(reason) => warn!("Proxy {} is unavailable: {}", proxy, reason),
        }

        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Loopback proxy that answers the first CONNECT with `reply` and returns the request
    async fn spawn_fake_proxy(reply: &'static [u8]) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut client, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 2048];
            let n = client.read(&mut buf).await.unwrap();
            client.write_all(reply).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (addr, task)
    }

    fn validator() -> TunnelValidator {
        TunnelValidator::new("https://example.com").unwrap()
    }

    #[test]
    fn test_new_rejects_bad_target() {
        for raw in ["", "http://", "http://bad host", "https://example.com:70000"] {
            let err = TunnelValidator::new(raw).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)), "{:?}", raw);
        }
    }

    #[test]
    fn test_default_target() {
        let validator = TunnelValidator::new(DEFAULT_TARGET_URL).unwrap();
        let default = TunnelValidator::default();
        assert_eq!(validator.target(), default.target());
        assert_eq!(default.target().authority(), "www.google.com:443");
        assert_eq!(default.timeouts(), ProbeTimeouts::default());
    }

    #[test]
    fn test_validation_projection() {
        assert!(Validation::from_probe(Ok(StatusCode::OK)).is_available());

        let rejected = Validation::from_probe(Ok(StatusCode::FORBIDDEN));
        assert!(!rejected.is_available());
        assert_eq!(rejected.status(), Some(StatusCode::FORBIDDEN));

        let failed = Validation::from_probe(Err(ProbeError::Timeout("read")));
        assert!(!failed.is_available());
        assert_eq!(failed.status(), None);
        assert_eq!(failed.reason().as_deref(), Some("read timed out"));
    }

    #[tokio::test]
    async fn test_available_on_200() {
        let (addr, proxy_task) =
            spawn_fake_proxy(b"HTTP/1.1 200 Connection established\r\n\r\n").await;
        let proxy = ProxyDescriptor::new("127.0.0.1", addr.port());

        assert!(validator().is_available(&proxy).await);

        let request = proxy_task.await.unwrap();
        assert!(request.starts_with("CONNECT example.com:443 HTTP/1.1\r\n"));
        assert!(!request.contains("Proxy-Authorization"));
    }

    #[tokio::test]
    async fn test_sends_basic_auth() {
        let (addr, proxy_task) =
            spawn_fake_proxy(b"HTTP/1.1 200 Connection established\r\n\r\n").await;
        let proxy = ProxyDescriptor::new("127.0.0.1", addr.port()).with_credentials("u", "p");

        assert!(validator().is_available(&proxy).await);

        let request = proxy_task.await.unwrap();
        assert!(request.contains("Proxy-Authorization: Basic dTpw\r\n"));
    }

    #[tokio::test]
    async fn test_unavailable_on_other_status() {
        for reply in [
            &b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n"[..],
            b"HTTP/1.1 403 Forbidden\r\n\r\n",
            b"HTTP/1.1 502 Bad Gateway\r\n\r\n",
        ] {
            let (addr, _) = spawn_fake_proxy(reply).await;
            let proxy = ProxyDescriptor::new("127.0.0.1", addr.port());

            let validation = validator().validate(&proxy).await;
            assert!(matches!(validation, Validation::Rejected(_)));
            assert!(!validation.is_available());
        }
    }

    #[tokio::test]
    async fn test_unavailable_on_garbage_reply() {
        let (addr, _) = spawn_fake_proxy(b"SSH-2.0-OpenSSH_9.6\r\n").await;
        let proxy = ProxyDescriptor::new("127.0.0.1", addr.port());

        let validation = validator().validate(&proxy).await;
        assert!(matches!(validation, Validation::Failed(ProbeError::Parse(_))));
    }

    #[tokio::test]
    async fn test_unavailable_on_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let proxy = ProxyDescriptor::new("127.0.0.1", port);
        assert!(!validator().is_available(&proxy).await);
    }

    #[tokio::test]
    async fn test_unavailable_on_unknown_host() {
        let validator = validator().with_timeouts(ProbeTimeouts {
            connect: Some(Duration::from_secs(2)),
            read: Some(Duration::from_secs(2)),
        });
        let proxy = ProxyDescriptor::new("proxy.nonexistent.invalid", 8080);

        let validation = validator.validate(&proxy).await;
        assert!(matches!(validation, Validation::Failed(_)));
    }

    #[tokio::test]
    async fn test_invalid_descriptor_is_unavailable() {
        let validation = validator().validate(&ProxyDescriptor::new("", 8080)).await;
        assert!(matches!(validation, Validation::InvalidProxy(_)));

        let validation = validator()
            .validate(&ProxyDescriptor::new("127.0.0.1", 0))
            .await;
        assert!(matches!(validation, Validation::InvalidProxy(_)));
    }

    #[test]
    fn test_is_available_blocking() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let proxy_thread = std::thread::spawn(move || {
            let (mut client, _) = listener.accept().unwrap();
            let mut buf = [0u8; 2048];
            let _ = client.read(&mut buf).unwrap();
            client
                .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                .unwrap();
        });

        let proxy = ProxyDescriptor::new("127.0.0.1", port);
        assert!(validator().is_available_blocking(&proxy));
        proxy_thread.join().unwrap();
    }

    #[tokio::test]
    async fn test_is_available_blocking_inside_runtime_returns_false() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let proxy = ProxyDescriptor::new("127.0.0.1", port);

        assert!(!validator().is_available_blocking(&proxy));

        let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err(), "no connection should have been attempted");
    }
}
