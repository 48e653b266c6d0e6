//! Directory authentication for Bindgate

pub mod ldap;

pub use ldap::{
    AttributeValue, AuthError, Credential, DirectoryConnector, DirectoryEntry,
    DirectorySession, DirectorySettings, LdapAuthenticator, LdapConnector,
};
