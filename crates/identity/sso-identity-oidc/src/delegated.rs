//! [`AuthService`] backed by the `oauth2` crate.
//!
//! The library builds the authorization URL and performs the code exchange.
//! Random material still comes from [`crate::pkce`] so entropy failures
//! surface as errors, and userinfo, logout and photo handling are shared with
//! the pure implementation.

use crate::client::OidcClient;
use crate::config::AuthType;
use crate::error::{OidcError, OidcResult};
use crate::pkce;
use crate::service::{
    AuthService, complete_login, consume_challenge, fetch_user_photo, logout_session,
};
use crate::types::{CallbackParams, TokenExchangeResult, UserPhoto};
use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
};
use sso_identity_core::{AuthorizationChallenge, SessionIdentityStore, UserIdentity};
use tracing::{error, info};

type ProviderClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Clone)]
pub struct LibAuthService {
    client: OidcClient,
    oauth: ProviderClient,
}

impl LibAuthService {
    pub fn new(client: OidcClient) -> OidcResult<Self> {
        let config = client.config();
        let oauth = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.authorization_endpoint())?)
            .set_token_uri(TokenUrl::new(config.token_endpoint())?)
            .set_redirect_uri(RedirectUrl::new(config.redirect_uri.clone())?);

        Ok(Self { client, oauth })
    }
}

fn token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> OidcError
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => {
            error!("Token exchange rejected by provider: {}", response);
            OidcError::TokenExchangeFailed {
                status: None,
                body: serde_json::to_string(&response).unwrap_or_else(|_| response.to_string()),
            }
        }
        RequestTokenError::Request(e) => OidcError::Transport(e.to_string()),
        RequestTokenError::Parse(e, body) => {
            error!("Unparseable token response: {}", e);
            OidcError::TokenExchangeFailed {
                status: None,
                body: String::from_utf8_lossy(&body).into_owned(),
            }
        }
        RequestTokenError::Other(message) => OidcError::TokenExchangeFailed {
            status: None,
            body: message,
        },
    }
}

impl From<BasicTokenResponse> for TokenExchangeResult {
    fn from(response: BasicTokenResponse) -> Self {
        let token_type: &str = response.token_type().as_ref();
        TokenExchangeResult {
            access_token: response.access_token().secret().clone(),
            token_type: Some(token_type.to_string()),
            expires_in: response.expires_in().map(|expires_in| expires_in.as_secs()),
            refresh_token: response
                .refresh_token()
                .map(|refresh_token| refresh_token.secret().clone()),
            scope: response.scopes().map(|scopes| {
                scopes
                    .iter()
                    .map(|scope| scope.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
            id_token: None,
        }
    }
}

#[async_trait]
impl AuthService for LibAuthService {
    fn auth_type(&self) -> AuthType {
        AuthType::Lib
    }

    async fn get_login_url(&self, session: &dyn SessionIdentityStore) -> OidcResult<String> {
        let state = pkce::random_token()?;
        let nonce = pkce::random_token()?;
        let code_verifier = pkce::generate_verifier()?;
        let pkce_challenge = PkceCodeChallenge::from_code_verifier_sha256(
            &PkceCodeVerifier::new(code_verifier.clone()),
        );

        let scopes = self
            .client
            .config()
            .scopes
            .split_whitespace()
            .map(|scope| Scope::new(scope.to_string()));

        let (url, csrf_token) = self
            .oauth
            .authorize_url(|| CsrfToken::new(state))
            .add_scopes(scopes)
            .add_extra_param("nonce", nonce.clone())
            .set_pkce_challenge(pkce_challenge)
            .url();

        session
            .put_challenge(AuthorizationChallenge {
                state: csrf_token.secret().clone(),
                nonce,
                code_verifier,
            })
            .await?;

        info!("Redirecting to provider for authorization");
        Ok(url.to_string())
    }

    async fn handle_callback(
        &self,
        session: &dyn SessionIdentityStore,
        params: CallbackParams,
    ) -> OidcResult<UserIdentity> {
        let grant = consume_challenge(session, &params).await?;

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(grant.code))
            .set_pkce_verifier(PkceCodeVerifier::new(grant.code_verifier))
            .request_async(self.client.http_client())
            .await
            .map_err(token_error)?;

        info!("Successfully exchanged code for tokens");
        complete_login(&self.client, session, response.into()).await
    }

    async fn logout(&self, session: &dyn SessionIdentityStore) -> OidcResult<String> {
        logout_session(&self.client, session).await
    }

    async fn get_user_photo(&self, session: &dyn SessionIdentityStore) -> OidcResult<UserPhoto> {
        fetch_user_photo(&self.client, session).await
    }
}
