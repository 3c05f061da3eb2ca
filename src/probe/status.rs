//! Status line parsing

use http::StatusCode;

use crate::error::ProbeError;

const STATUS_TOKEN: &str = "http/1.1 ";

/// Extract the status code following the first `HTTP/1.1 ` token in `response`.
///
/// Bytes are decoded as Latin-1. Only HTTP/1.1 status lines are recognized.
pub fn parse_status_code(response: &[u8]) -> Result<StatusCode, ProbeError> {
    let text: String = response.iter().map(|&b| b as char).collect();
    let lowered = text.to_ascii_lowercase();

    let start = lowered
        .find(STATUS_TOKEN)
        .map(|idx| idx + STATUS_TOKEN.len())
        .ok_or_else(|| ProbeError::Parse(first_line(&text)))?;

    let digits: String = lowered[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(ProbeError::Parse(first_line(&text)));
    }

    digits
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| ProbeError::Parse(first_line(&text)))
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        "empty response".to_string()
    } else {
        line.to_string()
    }
}
