//! proxy-check - HTTP CONNECT proxy validator
//!
//! Decides whether a candidate HTTP proxy can be put into rotation by asking it to open a
//! CONNECT tunnel to a known target and reading the status line of its reply.
//!
//! ## Features
//!
//! - CONNECT request building with optional Basic proxy authentication
//! - One fresh connection per validation, closed on every path
//! - Bounded single read of the proxy's reply
//! - Configurable connect/read deadlines
//! - Boolean verdict plus an opt-in detailed [`Validation`] result
//!
//! ```no_run
//! use proxy_check::{ProxyDescriptor, ProxyValidator, TunnelValidator};
//!
//! # async fn run() -> proxy_check::Result<()> {
//! let validator = TunnelValidator::new("https://www.google.com")?;
//! let proxy = ProxyDescriptor::new("10.0.0.1", 3128).with_credentials("user", "pass");
//!
//! if validator.is_available(&proxy).await {
//!     println!("{} is usable", proxy);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod probe;

pub use config::Config;
pub use error::{Error, ProbeError, Result};
pub use models::{Credentials, ProxyDescriptor, TargetAddress};
pub use probe::{ProxyValidator, TunnelValidator, Validation};
