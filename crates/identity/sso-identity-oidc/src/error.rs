//! OpenID Connect flow error types.

use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("Provider denied authorization: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
        state: Option<String>,
    },

    #[error("Invalid state parameter")]
    StateMismatch,

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    #[error("Token exchange failed ({status:?}): {body}")]
    TokenExchangeFailed { status: Option<u16>, body: String },

    #[error("User info request failed ({status}): {body}")]
    UserInfoFailed { status: u16, body: String },

    #[error("User photo request failed ({status}): {body}")]
    PhotoFetchFailed { status: u16, body: String },

    #[error("No access token retained for this session")]
    TokenNotRetained,

    #[error("Secure random source unavailable: {0}")]
    RandomSourceFailure(String),

    /// Connection failures and timeouts, from either variant.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Session store error: {0}")]
    SessionError(#[from] sso_identity_core::IdentityError),
}

impl From<reqwest::Error> for OidcError {
    fn from(err: reqwest::Error) -> Self {
        OidcError::Transport(err.to_string())
    }
}

impl OidcError {
    /// Whether the failure came from the provider or the network rather than the user's request.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            OidcError::TokenExchangeFailed { .. }
                | OidcError::UserInfoFailed { .. }
                | OidcError::PhotoFetchFailed { .. }
                | OidcError::Transport(_)
        )
    }
}
