//! Login service facade.
//!
//! [`AuthService`] is the capability set the web layer talks to. Two
//! implementations exist and one is picked at startup by [`build_auth_service`]
//! from [`AuthType`].

use crate::authorize::build_authorization_request;
use crate::callback::validate_callback;
use crate::client::OidcClient;
use crate::config::{AuthType, OidcConfig};
use crate::delegated::LibAuthService;
use crate::error::{OidcError, OidcResult};
use crate::logout::build_logout_url;
use crate::types::{AuthorizationGrant, CallbackParams, TokenExchangeResult, UserPhoto};
use async_trait::async_trait;
use sso_identity_core::{SessionIdentityStore, UserIdentity};
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait AuthService: Send + Sync {
    fn auth_type(&self) -> AuthType;

    /// Store a fresh challenge in the session and return the provider redirect.
    async fn get_login_url(&self, session: &dyn SessionIdentityStore) -> OidcResult<String>;

    /// Validate the callback, exchange the code and store the identity.
    ///
    /// The stored challenge is consumed whatever the outcome.
    async fn handle_callback(
        &self,
        session: &dyn SessionIdentityStore,
        params: CallbackParams,
    ) -> OidcResult<UserIdentity>;

    /// Clear the whole session and return the provider logout URL.
    async fn logout(&self, session: &dyn SessionIdentityStore) -> OidcResult<String>;

    /// The logged in user, or `None`.
    async fn get_user(
        &self,
        session: &dyn SessionIdentityStore,
    ) -> OidcResult<Option<UserIdentity>> {
        Ok(session.get_identity().await?)
    }

    /// Photo of the logged in user; needs token retention.
    async fn get_user_photo(&self, session: &dyn SessionIdentityStore) -> OidcResult<UserPhoto>;
}

/// Pick the implementation named by the configuration.
pub fn build_auth_service(config: OidcConfig) -> OidcResult<Arc<dyn AuthService>> {
    config.validate()?;
    let auth_type = config.auth_type;
    let client = OidcClient::new(Arc::new(config))?;

    info!("Using '{}' authentication service", auth_type);
    Ok(match auth_type {
        AuthType::Pure => Arc::new(PureAuthService::new(client)),
        AuthType::Lib => Arc::new(LibAuthService::new(client)?),
    })
}

/// Take the challenge out of the session and validate the callback against it.
pub(crate) async fn consume_challenge(
    session: &dyn SessionIdentityStore,
    params: &CallbackParams,
) -> OidcResult<AuthorizationGrant> {
    let stored = session.take_challenge().await?;
    validate_callback(params, stored.as_ref()).inspect_err(|e| match e {
        OidcError::ProviderDenied { error, .. } => {
            warn!("Provider returned an error on callback: {}", error)
        }
        _ => warn!("Rejected callback: {}", e),
    })
}

/// Fetch the identity and store it; nothing is written unless every step succeeded.
pub(crate) async fn complete_login(
    client: &OidcClient,
    session: &dyn SessionIdentityStore,
    token: TokenExchangeResult,
) -> OidcResult<UserIdentity> {
    let identity = client.fetch_identity(&token.access_token).await?;

    session.put_identity(&identity).await?;
    if client.config().retain_access_token {
        session.put_access_token(&token.access_token).await?;
    }

    info!("User {} logged in", identity.subject);
    Ok(identity)
}

pub(crate) async fn logout_session(
    client: &OidcClient,
    session: &dyn SessionIdentityStore,
) -> OidcResult<String> {
    session.clear_all().await?;
    info!("Session cleared on logout");
    build_logout_url(client.config())
}

pub(crate) async fn fetch_user_photo(
    client: &OidcClient,
    session: &dyn SessionIdentityStore,
) -> OidcResult<UserPhoto> {
    let access_token = session
        .get_access_token()
        .await?
        .ok_or(OidcError::TokenNotRetained)?;
    client.fetch_photo(&access_token).await
}

/// Hand-built authorization code flow with PKCE.
#[derive(Clone)]
pub struct PureAuthService {
    client: OidcClient,
}

impl PureAuthService {
    pub fn new(client: OidcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AuthService for PureAuthService {
    fn auth_type(&self) -> AuthType {
        AuthType::Pure
    }

    async fn get_login_url(&self, session: &dyn SessionIdentityStore) -> OidcResult<String> {
        let (url, challenge) = build_authorization_request(self.client.config())?;
        session.put_challenge(challenge).await?;
        info!("Redirecting to provider for authorization");
        Ok(url)
    }

    async fn handle_callback(
        &self,
        session: &dyn SessionIdentityStore,
        params: CallbackParams,
    ) -> OidcResult<UserIdentity> {
        let grant = consume_challenge(session, &params).await?;
        let token = self
            .client
            .exchange_code(&grant.code, &grant.code_verifier)
            .await?;
        complete_login(&self.client, session, token).await
    }

    async fn logout(&self, session: &dyn SessionIdentityStore) -> OidcResult<String> {
        logout_session(&self.client, session).await
    }

    async fn get_user_photo(&self, session: &dyn SessionIdentityStore) -> OidcResult<UserPhoto> {
        fetch_user_photo(&self.client, session).await
    }
}
