//! Directory authentication types
//!
//! Covers:
//! - Connection settings derived from the gateway configuration
//! - Normalized directory entries
//! - The opaque authentication error

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bindgate_core::config::LdapConfigSection;
use ldap3::{ldap_escape, SearchEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Directory Settings
// ============================================================================

/// Validated, immutable directory settings for the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    /// Connection URL, e.g. "ldap://dc01.example.com:389"
    pub server_url: String,

    /// Domain suffix appended to bare logins for the bind identity
    pub bind_suffix: Option<String>,

    /// Subtree root for the entry search
    pub base_dn: String,

    /// Attribute matched against the login
    pub login_attribute: String,

    pub start_tls: bool,

    pub skip_tls_verify: bool,

    /// Connection timeout handed to the client; `None` keeps its default
    pub timeout: Option<Duration>,

    /// Emit single-valued attributes as a bare string
    pub flatten_single_values: bool,
}

impl DirectorySettings {
    /// Validate the configuration section.
    ///
    /// Fails with [`bindgate_core::Error::MissingConfiguration`] when the server
    /// host or the base DN is absent.
    pub fn from_section(section: &LdapConfigSection) -> bindgate_core::Result<Self> {
        if !section.is_complete() {
            return Err(bindgate_core::Error::MissingConfiguration);
        }

        let server = section.server.as_deref().unwrap_or_default();
        let base_dn = section.base_dn.as_deref().unwrap_or_default();

        if section.login_attribute.trim().is_empty() {
            return Err(bindgate_core::Error::InvalidConfig(
                "Login attribute must not be empty".to_string(),
            ));
        }

        Ok(Self {
            server_url: build_server_url(server, section.port),
            bind_suffix: section
                .bind_suffix
                .as_deref()
                .map(|s| s.trim().trim_start_matches('@'))
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            base_dn: base_dn.trim().to_string(),
            login_attribute: section.login_attribute.trim().to_string(),
            start_tls: section.start_tls,
            skip_tls_verify: section.skip_tls_verify,
            timeout: section.timeout_seconds.map(Duration::from_secs),
            flatten_single_values: section.flatten_single_values,
        })
    }

    /// Identity presented in the simple bind
    pub fn bind_identity(&self, login: &str) -> String {
        match &self.bind_suffix {
            Some(suffix) => format!("{}@{}", login, suffix),
            None => login.to_string(),
        }
    }

    /// Search filter selecting the entry for `login`.
    ///
    /// The login is escaped so filter metacharacters match literally.
    pub fn user_filter(&self, login: &str) -> String {
        format!("({}={})", self.login_attribute, ldap_escape(login))
    }
}

/// Turn a configured host into a connection URL.
///
/// A bare host gets the `ldap://` scheme. An explicit port inside the host
/// wins over the configured one. Bare IPv6 addresses are bracketed.
fn build_server_url(server: &str, port: u16) -> String {
    let server = server.trim().trim_end_matches('/');

    let (scheme, authority) = if let Some(rest) = server.strip_prefix("ldaps://") {
        ("ldaps", rest)
    } else if let Some(rest) = server.strip_prefix("ldap://") {
        ("ldap", rest)
    } else {
        ("ldap", server)
    };

    if !authority.starts_with('[') && authority.matches(':').count() > 1 {
        return format!("{}://[{}]:{}", scheme, authority, port);
    }

    let host_part = authority.rsplit(']').next().unwrap_or(authority);
    if host_part.contains(':') {
        format!("{}://{}", scheme, authority)
    } else {
        format!("{}://{}:{}", scheme, authority, port)
    }
}

// ============================================================================
// Credential
// ============================================================================

/// Login/password pair submitted by a caller
#[derive(Clone, Deserialize)]
pub struct Credential {
    /// User login (e.g. sAMAccountName)
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Directory Entry
// ============================================================================

/// Value of a directory attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multi(Vec<String>),
}

/// Normalized directory entry returned after a successful bind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Distinguished Name of the entry
    pub dn: String,

    /// Every attribute the server returned, keyed by its reported name
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl DirectoryEntry {
    /// Normalize a raw search entry.
    ///
    /// Binary attribute values are base64 encoded.
    pub fn from_search_entry(entry: SearchEntry, flatten_single_values: bool) -> Result<Self, AuthError> {
        if entry.dn.trim().is_empty() {
            return Err(AuthError::Decode("entry has no distinguished name".to_string()));
        }

        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, vals) in entry.attrs {
            values.entry(name).or_default().extend(vals);
        }
        for (name, vals) in entry.bin_attrs {
            values
                .entry(name)
                .or_default()
                .extend(vals.iter().map(|v| BASE64.encode(v)));
        }

        let attributes = values
            .into_iter()
            .map(|(name, mut vals)| {
                let value = if flatten_single_values && vals.len() == 1 {
                    AttributeValue::Single(vals.remove(0))
                } else {
                    AttributeValue::Multi(vals)
                };
                (name, value)
            })
            .collect();

        Ok(Self {
            dn: entry.dn,
            attributes,
        })
    }
}

// ============================================================================
// Authentication Error
// ============================================================================

/// Why an authentication attempt failed.
///
/// Callers outside the authenticator only see that it failed; the variant is
/// for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("directory connection failed: {0}")]
    Connect(String),

    #[error("empty password rejected")]
    EmptyPassword,

    #[error("bind rejected: {0}")]
    Bind(String),

    #[error("entry search failed: {0}")]
    Search(String),

    #[error("no entry matched the login")]
    NotFound,

    #[error("directory entry could not be decoded: {0}")]
    Decode(String),
}

impl AuthError {
    /// Stable tag used as the structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Connect(_) => "connect",
            AuthError::EmptyPassword => "empty_password",
            AuthError::Bind(_) => "bind",
            AuthError::Search(_) => "search",
            AuthError::NotFound => "not_found",
            AuthError::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn section() -> LdapConfigSection {
        LdapConfigSection {
            server: Some("dc01.example.com".to_string()),
            base_dn: Some("OU=Users,DC=example,DC=com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_server_or_base_dn() {
        let mut config = section();
        config.server = None;
        assert!(matches!(
            DirectorySettings::from_section(&config),
            Err(bindgate_core::Error::MissingConfiguration)
        ));

        let mut config = section();
        config.base_dn = Some("   ".to_string());
        assert!(matches!(
            DirectorySettings::from_section(&config),
            Err(bindgate_core::Error::MissingConfiguration)
        ));
    }

    #[test]
    fn test_server_url_building() {
        assert_eq!(build_server_url("dc01.example.com", 389), "ldap://dc01.example.com:389");
        assert_eq!(build_server_url("ldaps://dc01.example.com", 636), "ldaps://dc01.example.com:636");
        assert_eq!(build_server_url("ldap://dc01.example.com:3389/", 389), "ldap://dc01.example.com:3389");
        assert_eq!(build_server_url("[::1]", 389), "ldap://[::1]:389");
        assert_eq!(build_server_url("[::1]:1389", 389), "ldap://[::1]:1389");
    }

    #[test]
    fn test_bare_ipv6_host_is_bracketed() {
        assert_eq!(build_server_url("fe80::1", 389), "ldap://[fe80::1]:389");
        assert_eq!(build_server_url("ldaps://2001:db8::10", 636), "ldaps://[2001:db8::10]:636");

        let mut config = section();
        config.server = Some("fe80::1".to_string());
        let settings = DirectorySettings::from_section(&config).unwrap();
        assert_eq!(settings.server_url, "ldap://[fe80::1]:389");
    }

    #[test]
    fn test_bind_identity() {
        let settings = DirectorySettings::from_section(&section()).unwrap();
        assert_eq!(settings.bind_identity("jdoe"), "jdoe");

        let mut config = section();
        config.bind_suffix = Some("example.com".to_string());
        let settings = DirectorySettings::from_section(&config).unwrap();
        assert_eq!(settings.bind_identity("jdoe"), "jdoe@example.com");

        config.bind_suffix = Some("@example.com".to_string());
        let settings = DirectorySettings::from_section(&config).unwrap();
        assert_eq!(settings.bind_identity("jdoe"), "jdoe@example.com");
    }

    #[test]
    fn test_user_filter_escapes_login() {
        let settings = DirectorySettings::from_section(&section()).unwrap();

        assert_eq!(settings.user_filter("jdoe"), "(sAMAccountName=jdoe)");
        assert_eq!(settings.user_filter("*"), "(sAMAccountName=\\2a)");
        assert_eq!(
            settings.user_filter("x)(objectClass=*"),
            "(sAMAccountName=x\\29\\28objectClass=\\2a)"
        );
    }

    #[test]
    fn test_entry_normalization() {
        let entry = SearchEntry {
            dn: "CN=John Doe,OU=Users,DC=example,DC=com".to_string(),
            attrs: HashMap::from([
                ("cn".to_string(), vec!["John Doe".to_string()]),
                (
                    "memberOf".to_string(),
                    vec!["CN=Staff,DC=example,DC=com".to_string(), "CN=VPN,DC=example,DC=com".to_string()],
                ),
            ]),
            bin_attrs: HashMap::from([("objectGUID".to_string(), vec![vec![0xde, 0xad, 0xbe, 0xef]])]),
        };

        let normalized = DirectoryEntry::from_search_entry(entry.clone(), false).unwrap();
        assert_eq!(normalized.dn, "CN=John Doe,OU=Users,DC=example,DC=com");
        assert_eq!(
            normalized.attributes.get("cn"),
            Some(&AttributeValue::Multi(vec!["John Doe".to_string()]))
        );
        assert_eq!(
            normalized.attributes.get("objectGUID"),
            Some(&AttributeValue::Multi(vec!["3q2+7w==".to_string()]))
        );
        let keys: Vec<&str> = normalized.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["cn", "memberOf", "objectGUID"]);

        let flattened = DirectoryEntry::from_search_entry(entry, true).unwrap();
        assert_eq!(
            flattened.attributes.get("cn"),
            Some(&AttributeValue::Single("John Doe".to_string()))
        );
        assert!(matches!(flattened.attributes.get("memberOf"), Some(AttributeValue::Multi(v)) if v.len() == 2));
    }

    #[test]
    fn test_entry_without_dn_is_decode_failure() {
        let entry = SearchEntry {
            dn: String::new(),
            attrs: HashMap::new(),
            bin_attrs: HashMap::new(),
        };

        let err = DirectoryEntry::from_search_entry(entry, false).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_attribute_value_serialization() {
        let json = serde_json::to_value(AttributeValue::Single("a".to_string())).unwrap();
        assert_eq!(json, serde_json::json!("a"));

        let json = serde_json::to_value(AttributeValue::Multi(vec!["a".to_string()])).unwrap();
        assert_eq!(json, serde_json::json!(["a"]));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential {
            login: "jdoe".to_string(),
            password: "hunter2".to_string(),
        };

        let debug = format!("{:?}", credential);
        assert!(!debug.contains("jdoe"));
        assert!(!debug.contains("hunter2"));
    }
}
