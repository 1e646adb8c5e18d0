//! OpenID Connect login against a single provider.
//!
//! Implements the authorization code flow hardened with PKCE and state/nonce
//! binding. Continuity between the redirect, the callback and later requests
//! flows only through a [`SessionIdentityStore`].
//!
//! Userinfo claims are trusted as returned over the bearer token; the ID token
//! signature and the nonce are not verified.

mod authorize;
mod callback;
mod client;
mod config;
mod delegated;
mod error;
mod logout;
mod pkce;
mod service;
mod types;


pub use authorize::{authorization_url, build_authorization_request};
pub use callback::validate_callback;
pub use client::OidcClient;
pub use config::{AuthType, OidcConfig};
pub use delegated::LibAuthService;
pub use error::{OidcError, OidcResult};
pub use logout::build_logout_url;
pub use pkce::{PkceChallenge, derive_challenge, generate_verifier, random_token};
pub use service::{AuthService, PureAuthService, build_auth_service};
pub use types::{AuthorizationGrant, CallbackParams, TokenExchangeResult, UserInfoClaims, UserPhoto};

// Re-export common types for convenience
pub use sso_identity_core::{AuthorizationChallenge, SessionIdentityStore, UserIdentity};
