//! Directory connections
//!
//! The authenticator talks to the directory through [`DirectoryConnector`]
//! and [`DirectorySession`]. [`LdapConnector`] is the `ldap3` backed
//! implementation; supports LDAP, LDAPS and STARTTLS.

use crate::ldap::types::{AuthError, DirectorySettings};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::time::Duration;
use tracing::debug;

/// Opens one connection per authentication attempt
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, AuthError>;
}

/// A single open directory connection
#[async_trait]
pub trait DirectorySession: Send {
    /// Simple bind with the given identity and password
    async fn bind(&mut self, identity: &str, password: &str) -> Result<(), AuthError>;

    /// Subtree search below `base_dn` returning all user attributes
    async fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<SearchEntry>, AuthError>;

    /// Release the connection
    async fn close(&mut self);
}

/// Connector for real LDAP servers
#[derive(Debug, Clone)]
pub struct LdapConnector {
    server_url: String,
    start_tls: bool,
    skip_tls_verify: bool,
    timeout: Option<Duration>,
}

impl LdapConnector {
    pub fn new(settings: &DirectorySettings) -> Self {
        Self {
            server_url: settings.server_url.clone(),
            start_tls: settings.start_tls,
            skip_tls_verify: settings.skip_tls_verify,
            timeout: settings.timeout,
        }
    }

    fn conn_settings(&self) -> LdapConnSettings {
        let mut settings = LdapConnSettings::new()
            .set_starttls(self.start_tls)
            .set_no_tls_verify(self.skip_tls_verify);

        if let Some(timeout) = self.timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        settings
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, AuthError> {
        debug!("Connecting to LDAP server: {}", self.server_url);

        let (conn, ldap) = LdapConnAsync::with_settings(self.conn_settings(), &self.server_url)
            .await
            .map_err(|e| AuthError::Connect(describe(&e)))?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapSession { ldap }))
    }
}

/// Live `ldap3` connection.
///
/// If dropped without `close`, the driver task shuts the socket once the
/// last handle is gone.
struct LdapSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, identity: &str, password: &str) -> Result<(), AuthError> {
        self.ldap
            .simple_bind(identity, password)
            .await
            .map_err(|e| AuthError::Bind(describe(&e)))?
            .success()
            .map_err(|e| AuthError::Bind(describe(&e)))?;

        Ok(())
    }

    async fn search(&mut self, base_dn: &str, filter: &str) -> Result<Vec<SearchEntry>, AuthError> {
        let (rs, _res) = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, vec!["*"])
            .await
            .map_err(|e| AuthError::Search(describe(&e)))?
            .success()
            .map_err(|e| AuthError::Search(describe(&e)))?;

        // Continuation references are not entries
        let entries: Vec<SearchEntry> = rs
            .into_iter()
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(SearchEntry::construct)
            .collect();

        debug!("Directory search returned {} entries", entries.len());
        Ok(entries)
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {}", describe(&e));
        }
    }
}

/// Render an `ldap3` error without echoing request values.
///
/// Server results are reduced to their result code; the matched DN and
/// diagnostic text may quote the bind identity.
fn describe(err: &LdapError) -> String {
    match err {
        LdapError::LdapResult { result } => format!("result code {}", result.rc),
        other => other.to_string(),
    }
}
