//! Directory authenticator
//!
//! Binds with the caller's credentials, looks up the matching entry and
//! returns it normalized. Every attempt uses its own connection, released
//! before the call returns.

use crate::ldap::session::{DirectoryConnector, DirectorySession, LdapConnector};
use crate::ldap::types::*;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Authenticates logins against a directory server
#[derive(Clone)]
pub struct LdapAuthenticator {
    settings: DirectorySettings,
    connector: Arc<dyn DirectoryConnector>,
}

impl LdapAuthenticator {
    /// Create an authenticator talking to the configured LDAP server
    pub fn new(settings: DirectorySettings) -> Self {
        let connector = Arc::new(LdapConnector::new(&settings));
        Self::with_connector(settings, connector)
    }

    /// Create an authenticator over a custom connector
    pub fn with_connector(settings: DirectorySettings, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    /// Authenticate `login` with `password` and fetch its directory entry.
    ///
    /// Failures are logged by kind only; neither the login nor the password
    /// reaches the log.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<DirectoryEntry, AuthError> {
        let result = self.open_and_authenticate(login, password).await;

        match &result {
            Ok(_) => debug!("LDAP authentication succeeded"),
            Err(e @ AuthError::Decode(_)) => {
                error!(kind = e.kind(), error = %e, "Failed to decode LDAP entry")
            }
            Err(e) => warn!(kind = e.kind(), error = %e, "LDAP authentication failed"),
        }

        result
    }

    async fn open_and_authenticate(&self, login: &str, password: &str) -> Result<DirectoryEntry, AuthError> {
        let mut open = OpenSession::new(self.connector.connect().await?);

        let outcome = match open.session.as_deref_mut() {
            Some(session) => self.bind_and_search(session, login, password).await,
            None => Err(AuthError::Connect("session already released".to_string())),
        };
        open.close().await;

        outcome
    }

    async fn bind_and_search(
        &self,
        session: &mut dyn DirectorySession,
        login: &str,
        password: &str,
    ) -> Result<DirectoryEntry, AuthError> {
        // An empty simple bind is an anonymous bind and would always succeed
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let identity = self.settings.bind_identity(login);
        session.bind(&identity, password).await?;

        let filter = self.settings.user_filter(login);
        let entries = session.search(&self.settings.base_dn, &filter).await?;

        let entry = entries.into_iter().next().ok_or(AuthError::NotFound)?;

        DirectoryEntry::from_search_entry(entry, self.settings.flatten_single_values)
    }
}

/// An open session that is released even when the attempt is dropped
/// before it finishes.
struct OpenSession {
    session: Option<Box<dyn DirectorySession>>,
}

impl OpenSession {
    fn new(session: Box<dyn DirectorySession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn close(mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        // Only reached when the caller stopped polling mid-attempt
        let Some(mut session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Releasing abandoned LDAP session");
                handle.spawn(async move { session.close().await });
            }
            Err(_) => warn!("No runtime to release abandoned LDAP session"),
        }
    }
}
