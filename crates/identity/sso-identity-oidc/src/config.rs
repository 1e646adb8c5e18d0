//! Provider configuration.

use crate::error::{OidcError, OidcResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Which [`AuthService`](crate::AuthService) implementation drives the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Hand-built PKCE flow.
    Pure,
    /// Authorization URL and code exchange delegated to the `oauth2` crate.
    #[default]
    Lib,
}

impl FromStr for AuthType {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pure" => Ok(AuthType::Pure),
            "lib" => Ok(AuthType::Lib),
            other => Err(OidcError::ConfigError(format!(
                "Unknown auth type '{}', expected 'pure' or 'lib'",
                other
            ))),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Pure => write!(f, "pure"),
            AuthType::Lib => write!(f, "lib"),
        }
    }
}

/// Immutable provider and client settings, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Base URL of the identity provider; endpoints hang off it.
    pub provider_url: String,
    /// Public URL of this service.
    pub service_url: Option<String>,
    pub redirect_uri: String,
    /// Space separated, sent verbatim.
    pub scopes: String,
    pub client_id: String,
    pub client_secret: String,
    /// Local landing page the provider returns to after logout.
    pub logout_uri: String,
    pub auth_type: AuthType,
    /// Keep the access token in the session for photo fetches.
    pub retain_access_token: bool,
    pub http_timeout_seconds: u64,
}

impl OidcConfig {
    pub fn new(
        provider_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        logout_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider_url: provider_url.into(),
            service_url: None,
            redirect_uri: redirect_uri.into(),
            scopes: "openid email profile".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            logout_uri: logout_uri.into(),
            auth_type: AuthType::default(),
            retain_access_token: false,
            http_timeout_seconds: 30,
        }
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = auth_type;
        self
    }

    pub fn with_token_retention(mut self, retain: bool) -> Self {
        self.retain_access_token = retain;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// Load from `GOVBR_*` environment variables.
    pub fn from_env() -> OidcResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup using the `GOVBR_*` names.
    pub fn from_lookup<F>(lookup: F) -> OidcResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| OidcError::ConfigError(format!("{} is required", key)))
        };

        let auth_type = match lookup("GOVBR_AUTH_TYPE") {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => AuthType::default(),
        };

        let retain_access_token = match lookup("GOVBR_RETAIN_TOKEN") {
            Some(value) => matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            None => false,
        };

        let http_timeout_seconds = match lookup("GOVBR_HTTP_TIMEOUT") {
            Some(value) => value.trim().parse().map_err(|_| {
                OidcError::ConfigError("GOVBR_HTTP_TIMEOUT must be a number of seconds".to_string())
            })?,
            None => 30,
        };

        let config = Self {
            provider_url: required("GOVBR_URL_PROVIDER")?,
            service_url: lookup("GOVBR_URL_SERVICE").filter(|value| !value.trim().is_empty()),
            redirect_uri: required("GOVBR_REDIRECT_URI")?,
            scopes: required("GOVBR_SCOPES")?,
            client_id: required("GOVBR_CLIENT_ID")?,
            client_secret: required("GOVBR_CLIENT_SECRET")?,
            logout_uri: required("GOVBR_LOGOUT_URI")?,
            auth_type,
            retain_access_token,
            http_timeout_seconds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that every URL parses and a client secret is present.
    pub fn validate(&self) -> OidcResult<()> {
        if self.client_secret.is_empty() {
            return Err(OidcError::ConfigError(
                "A client secret is required".to_string(),
            ));
        }
        Url::parse(self.base_url())?;
        Url::parse(&self.redirect_uri)?;
        Url::parse(&self.logout_uri)?;
        Ok(())
    }

    fn base_url(&self) -> &str {
        self.provider_url.trim_end_matches('/')
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/authorize", self.base_url())
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.base_url())
    }

    pub fn userinfo_endpoint(&self) -> String {
        format!("{}/userinfo", self.base_url())
    }

    pub fn photo_endpoint(&self) -> String {
        format!("{}/userinfo/picture", self.base_url())
    }

    pub fn logout_endpoint(&self) -> String {
        format!("{}/logout", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GOVBR_URL_PROVIDER", "https://sso.staging.acesso.gov.br/"),
            ("GOVBR_URL_SERVICE", "https://service.example.gov.br"),
            ("GOVBR_REDIRECT_URI", "http://localhost:8000/openid"),
            ("GOVBR_SCOPES", "openid email profile govbr_confiabilidades"),
            ("GOVBR_CLIENT_ID", "client-123"),
            ("GOVBR_CLIENT_SECRET", "secret-456"),
            ("GOVBR_LOGOUT_URI", "http://localhost:8000/logout/govbr"),
            ("GOVBR_AUTH_TYPE", "pure"),
        ])
    }

    #[test]
    fn test_config_from_lookup() {
        let vars = env();
        let config = OidcConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.auth_type, AuthType::Pure);
        assert_eq!(config.client_id, "client-123");
        assert!(!config.retain_access_token);
        assert_eq!(config.http_timeout_seconds, 30);
        assert_eq!(
            config.authorization_endpoint(),
            "https://sso.staging.acesso.gov.br/authorize"
        );
        assert_eq!(
            config.photo_endpoint(),
            "https://sso.staging.acesso.gov.br/userinfo/picture"
        );
    }

    #[test]
    fn test_missing_client_secret_is_rejected() {
        let mut vars = env();
        vars.insert("GOVBR_CLIENT_SECRET", "  ");
        let result = OidcConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert!(matches!(result, Err(OidcError::ConfigError(_))));
    }

    #[test]
    fn test_auth_type_parsing() {
        assert_eq!("PURE".parse::<AuthType>().unwrap(), AuthType::Pure);
        assert_eq!("lib".parse::<AuthType>().unwrap(), AuthType::Lib);
        assert!("socialite".parse::<AuthType>().is_err());

        let mut vars = env();
        vars.remove("GOVBR_AUTH_TYPE");
        let config = OidcConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.auth_type, AuthType::Lib);
    }

    #[test]
    fn test_token_retention_flag() {
        let mut vars = env();
        vars.insert("GOVBR_RETAIN_TOKEN", "true");
        vars.insert("GOVBR_HTTP_TIMEOUT", "5");
        let config = OidcConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert!(config.retain_access_token);
        assert_eq!(config.http_timeout_seconds, 5);
    }
}
