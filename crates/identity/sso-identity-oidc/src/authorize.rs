//! Authorization request construction.

use crate::config::OidcConfig;
use crate::error::OidcResult;
use crate::pkce::{self, PkceChallenge};
use sso_identity_core::AuthorizationChallenge;
use tracing::debug;
use url::Url;

/// Generate fresh per-attempt material and the provider redirect URL.
///
/// Nothing is persisted here: the caller must store the returned challenge in
/// the session before redirecting.
pub fn build_authorization_request(
    config: &OidcConfig,
) -> OidcResult<(String, AuthorizationChallenge)> {
    let challenge = AuthorizationChallenge {
        state: pkce::random_token()?,
        nonce: pkce::random_token()?,
        code_verifier: pkce::generate_verifier()?,
    };

    let url = authorization_url(config, &challenge)?;
    Ok((url, challenge))
}

/// Authorization URL for an already generated challenge.
pub fn authorization_url(
    config: &OidcConfig,
    challenge: &AuthorizationChallenge,
) -> OidcResult<String> {
    let mut url = Url::parse(&config.authorization_endpoint())?;
    let pkce = PkceChallenge::from_verifier(challenge.code_verifier.clone());

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &config.scopes)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("nonce", &challenge.nonce)
        .append_pair("state", &challenge.state)
        .append_pair("code_challenge", &pkce.code_challenge)
        .append_pair("code_challenge_method", &pkce.code_challenge_method);

    debug!("Generated authorization URL for client {}", config.client_id);
    Ok(url.to_string())
}
