//! CONNECT request rendering

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Error, Result};
use crate::models::TargetAddress;

/// Build the HTTP CONNECT request for `target`
///
/// `proxy_host` is only checked for presence; the request itself addresses the target.
/// The `Proxy-Authorization` header is added when both `username` and `password` are given.
pub fn build_connect_request(
    proxy_host: &str,
    target: &TargetAddress,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<String> {
    if proxy_host.trim().is_empty() {
        return Err(Error::InvalidArgument("proxy host is required".into()));
    }
    if target.host.trim().is_empty() {
        return Err(Error::InvalidArgument("target host is required".into()));
    }

    let authority = target.authority();
    let mut request = format!(
        "CONNECT {authority} HTTP/1.1\r\n\
         Host: {authority}\r\n\
         Accept: */*\r\n\
         Content-Type: text/html\r\n\
         Proxy-Connection: Keep-Alive\r\n\
         Content-length: 0\r\n"
    );

    if let (Some(username), Some(password)) = (username, password) {
        request.push_str(&format!(
            "Proxy-Authorization: Basic {}\r\n",
            basic_credentials(username, password)
        ));
    }

    request.push_str("\r\n");
    Ok(request)
}

fn basic_credentials(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    BASE64.encode(credentials.as_bytes())
}
