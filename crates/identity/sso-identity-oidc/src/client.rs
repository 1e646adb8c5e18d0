//! HTTP client for the provider's token, userinfo and photo endpoints.

use crate::config::OidcConfig;
use crate::error::{OidcError, OidcResult};
use crate::types::{TokenExchangeResult, UserInfoClaims, UserPhoto};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use sso_identity_core::UserIdentity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Provider client. Cheap to clone; the configuration is shared.
#[derive(Clone)]
pub struct OidcClient {
    http_client: Client,
    config: Arc<OidcConfig>,
}

impl OidcClient {
    pub fn new(config: Arc<OidcConfig>) -> OidcResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| OidcError::ConfigError(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Exchange an authorization code for tokens.
    ///
    /// Client credentials go in an HTTP Basic header. No retries.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> OidcResult<TokenExchangeResult> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http_client
            .post(self.config.token_endpoint())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Token exchange failed with status {}", status.as_u16());
            return Err(OidcError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body: error_body(response).await,
            });
        }

        let body = response.text().await?;

        match serde_json::from_str::<TokenExchangeResult>(&body) {
            Ok(token) => {
                info!("Successfully exchanged code for tokens");
                Ok(token)
            }
            Err(e) => {
                error!("Token response without a usable access_token: {}", e);
                Err(OidcError::TokenExchangeFailed {
                    status: Some(status.as_u16()),
                    body,
                })
            }
        }
    }

    /// Fetch and normalize the user's claims.
    pub async fn fetch_identity(&self, access_token: &str) -> OidcResult<UserIdentity> {
        let response = self
            .http_client
            .get(self.config.userinfo_endpoint())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("User info request failed with status {}", status.as_u16());
            return Err(OidcError::UserInfoFailed {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let body = response.text().await?;
        let claims = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .filter(|value| value.is_object())
            .and_then(|value| serde_json::from_value::<UserInfoClaims>(value).ok())
            .ok_or_else(|| {
                error!("User info response is not a JSON object");
                OidcError::UserInfoFailed {
                    status: status.as_u16(),
                    body: body.clone(),
                }
            })?;

        let identity = UserIdentity::from(claims);
        debug!(
            "Successfully retrieved user info for subject: {}",
            identity.subject
        );
        Ok(identity)
    }

    /// Download the user's photo with a retained access token.
    pub async fn fetch_photo(&self, access_token: &str) -> OidcResult<UserPhoto> {
        let response = self
            .http_client
            .get(self.config.photo_endpoint())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("User photo request failed with status {}", status.as_u16());
            return Err(OidcError::PhotoFetchFailed {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or(DEFAULT_PHOTO_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(UserPhoto {
            content_type,
            bytes,
        })
    }
}

/// Body of an error response, for diagnostics only.
async fn error_body(response: Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not read provider error body: {}", e);
            String::new()
        }
    }
}
