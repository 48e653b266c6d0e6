//! Configuration for Bindgate

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub ldap: LdapConfigSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    /// Build configuration from process environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BINDGATE_HOST") {
            config.server.bind_address = addr;
        }
        if let Some(port) = get("PORT") {
            config.server.port = parse_var("PORT", &port)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            config.logging.format = format;
        }

        // Directory connection
        config.ldap.server = get("LDAP_SERVER");
        config.ldap.bind_suffix = get("LDAP_BIND_DN");
        config.ldap.base_dn = get("LDAP_BASE_DN");
        if let Some(port) = get("LDAP_PORT") {
            config.ldap.port = parse_var("LDAP_PORT", &port)?;
        }
        if let Some(attr) = get("LDAP_LOGIN_ATTRIBUTE") {
            config.ldap.login_attribute = attr;
        }
        if let Some(flag) = get("LDAP_START_TLS") {
            config.ldap.start_tls = parse_flag("LDAP_START_TLS", &flag)?;
        }
        if let Some(flag) = get("LDAP_SKIP_TLS_VERIFY") {
            config.ldap.skip_tls_verify = parse_flag("LDAP_SKIP_TLS_VERIFY", &flag)?;
        }
        if let Some(secs) = get("LDAP_TIMEOUT_SECS") {
            config.ldap.timeout_seconds = Some(parse_var("LDAP_TIMEOUT_SECS", &secs)?);
        }
        if let Some(flag) = get("LDAP_FLATTEN_SINGLE_VALUES") {
            config.ldap.flatten_single_values = parse_flag("LDAP_FLATTEN_SINGLE_VALUES", &flag)?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::InvalidConfig(format!("{} has an invalid value", key)))
}

fn parse_flag(key: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(crate::Error::InvalidConfig(format!(
            "{} must be a boolean",
            key
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LDAP/Active Directory Configuration Section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfigSection {
    /// Directory server host, optionally with an `ldap://` or `ldaps://` scheme
    #[serde(default)]
    pub server: Option<String>,

    /// Directory server port
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Domain suffix appended to the login to form the bind identity
    /// Example: "corp.example.com" turns "jdoe" into "jdoe@corp.example.com"
    #[serde(default)]
    pub bind_suffix: Option<String>,

    /// Base DN for user searches
    /// Example: "OU=Users,DC=example,DC=com"
    #[serde(default)]
    pub base_dn: Option<String>,

    /// Attribute compared against the login when searching
    #[serde(default = "default_login_attribute")]
    pub login_attribute: String,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Connection timeout in seconds; the client default applies when unset
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Emit single-valued attributes as a bare string instead of a list
    #[serde(default)]
    pub flatten_single_values: bool,
}

fn default_ldap_port() -> u16 {
    crate::DEFAULT_LDAP_PORT
}

fn default_login_attribute() -> String {
    crate::DEFAULT_LOGIN_ATTRIBUTE.to_string()
}

impl Default for LdapConfigSection {
    fn default() -> Self {
        Self {
            server: None,
            port: default_ldap_port(),
            bind_suffix: None,
            base_dn: None,
            login_attribute: default_login_attribute(),
            start_tls: false,
            skip_tls_verify: false,
            timeout_seconds: None,
            flatten_single_values: false,
        }
    }
}

impl LdapConfigSection {
    /// Server host and base DN are both present and non-blank
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.server) && present(&self.base_dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.listen_address(), "0.0.0.0:8000");
        assert_eq!(config.ldap.port, 389);
        assert_eq!(config.ldap.login_attribute, "sAMAccountName");
        assert!(config.ldap.bind_suffix.is_none());
        assert!(config.ldap.timeout_seconds.is_none());
        assert!(!config.ldap.is_complete());
    }

    #[test]
    fn test_env_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("LDAP_SERVER", "dc01.example.com"),
            ("LDAP_PORT", "636"),
            ("LDAP_BIND_DN", "example.com"),
            ("LDAP_BASE_DN", "DC=example,DC=com"),
            ("LDAP_START_TLS", "true"),
            ("LDAP_TIMEOUT_SECS", "5"),
            ("PORT", "9090"),
        ]))
        .unwrap();

        assert_eq!(config.ldap.server.as_deref(), Some("dc01.example.com"));
        assert_eq!(config.ldap.port, 636);
        assert_eq!(config.ldap.bind_suffix.as_deref(), Some("example.com"));
        assert_eq!(config.ldap.base_dn.as_deref(), Some("DC=example,DC=com"));
        assert!(config.ldap.start_tls);
        assert_eq!(config.ldap.timeout_seconds, Some(5));
        assert_eq!(config.server.port, 9090);
        assert!(config.ldap.is_complete());
    }

    #[test]
    fn test_bind_address_uses_prefixed_variable() {
        let config = GatewayConfig::from_lookup(lookup(&[("HOST", "build-runner-42")])).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0");

        let config = GatewayConfig::from_lookup(lookup(&[
            ("HOST", "build-runner-42"),
            ("BINDGATE_HOST", "127.0.0.1"),
        ]))
        .unwrap();
        assert_eq!(config.server.listen_address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("LDAP_SERVER", ""),
            ("LDAP_BIND_DN", ""),
            ("LDAP_BASE_DN", "DC=example,DC=com"),
        ]))
        .unwrap();

        assert!(config.ldap.server.is_none());
        assert!(config.ldap.bind_suffix.is_none());
        assert!(!config.ldap.is_complete());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("LDAP_PORT", "ldap")])).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));

        let err = GatewayConfig::from_lookup(lookup(&[("LDAP_START_TLS", "maybe")])).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));
    }

    #[test]
    fn test_from_toml() {
        let config = GatewayConfig::from_toml(
            r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8080

            [ldap]
            server = "ldaps://dc01.example.com"
            port = 636
            base_dn = "OU=Users,DC=example,DC=com"
            flatten_single_values = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_address(), "127.0.0.1:8080");
        assert_eq!(config.ldap.port, 636);
        assert_eq!(config.ldap.login_attribute, "sAMAccountName");
        assert!(config.ldap.flatten_single_values);
        assert!(config.ldap.is_complete());
        assert_eq!(config.logging.level, "info");
    }
}
