use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Host and port every CONNECT tunnel is opened to
///
/// Derived once from the configured target URL and shared read-only by all validations of
/// one validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    pub port: u16,
}

impl TargetAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Derive the target from an absolute (`https://host[:port][/path]`) or relative
    /// (`host[:port]`) URL. Relative URLs are read as `http` and must be a bare authority.
    /// User-info is rejected in both forms.
    pub fn from_url(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidConfig("target URL must not be empty".into()));
        }

        let relative = !raw.contains("://");
        if relative && raw.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "target URL '{}' must start with a scheme or a host",
                raw
            )));
        }

        let url = if relative {
            Url::parse(&format!("http://{}", raw))
        } else {
            Url::parse(raw)
        }
        .map_err(|e| {
            Error::InvalidConfig(format!("target URL '{}' is not a valid URL: {}", raw, e))
        })?;

        if !url.username().is_empty() || url.password().is_some() {
            return Err(Error::InvalidConfig(format!(
                "target URL '{}' must not include credentials",
                raw
            )));
        }

        // A relative target is only `host[:port]`; anything after it means the input was
        // not what it looked like (e.g. `http:/example.com`).
        if relative
            && (!(url.path().is_empty() || url.path() == "/")
                || url.query().is_some()
                || url.fragment().is_some())
        {
            return Err(Error::InvalidConfig(format!(
                "target URL '{}' is not a valid host[:port]",
                raw
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("target URL '{}' must include a host", raw))
            })?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        let port = url.port_or_known_default().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "target URL '{}' has no port and scheme {} has no default",
                raw,
                url.scheme()
            ))
        })?;

        Ok(Self::new(host, port))
    }

    /// `host:port` form used in the request line and Host header
    pub fn authority(&self) -> String {
        format_authority(&self.host, self.port)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority())
    }
}

/// Join host and port, bracketing bare IPv6 literals
pub fn format_authority(host: &str, port: u16) -> String {
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
