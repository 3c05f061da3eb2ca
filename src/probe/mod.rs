//! Proxy validation engine
//!
//! This module provides:
//! - CONNECT request building with optional Basic proxy authentication
//! - The raw connect/send/receive exchange with a candidate proxy
//! - Status line parsing
//! - The validator that reduces all of it to an availability verdict

pub mod request;
pub mod status;
pub mod transport;
pub mod validator;

pub use request::build_connect_request;
pub use status::parse_status_code;
pub use transport::{ProbeTimeouts, TunnelTransport, RESPONSE_BUFFER_SIZE};
pub use validator::{ProxyValidator, TunnelValidator, Validation, DEFAULT_TARGET_URL};
