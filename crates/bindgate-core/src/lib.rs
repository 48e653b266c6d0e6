//! Bindgate Core Library
//!
//! Configuration, error types and shared constants for the Bindgate
//! directory authentication gateway.

pub mod config;
pub mod error;

pub use config::GatewayConfig;
pub use error::{Error, Result};

/// Bindgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default HTTP listen port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Attribute holding the account login on Active Directory
pub const DEFAULT_LOGIN_ATTRIBUTE: &str = "sAMAccountName";
