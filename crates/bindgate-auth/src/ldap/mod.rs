//! LDAP/Active Directory authentication module
//!
//! Bind-then-search authentication:
//! - Simple bind with the caller's login (optionally domain-qualified)
//! - Lookup of the matching entry below a base DN
//! - Normalization of every returned attribute
//! - LDAPS/STARTTLS support

mod client;
mod session;
mod types;

pub use client::LdapAuthenticator;
pub use session::{DirectoryConnector, DirectorySession, LdapConnector};
pub use types::*;
