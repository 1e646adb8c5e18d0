//! Provider callback validation.

use crate::error::{OidcError, OidcResult};
use crate::types::{AuthorizationGrant, CallbackParams};
use sso_identity_core::AuthorizationChallenge;

/// Check provider error signaling, then the state binding.
///
/// The state comparison is the only CSRF defense and happens before any
/// network call. A missing stored challenge (expired or already consumed
/// session) counts as a mismatch.
pub fn validate_callback(
    params: &CallbackParams,
    stored: Option<&AuthorizationChallenge>,
) -> OidcResult<AuthorizationGrant> {
    if let Some(error) = &params.error {
        return Err(OidcError::ProviderDenied {
            error: error.clone(),
            description: params.error_description.clone(),
            state: params.state.clone(),
        });
    }

    let stored = stored.ok_or(OidcError::StateMismatch)?;
    match params.state.as_deref() {
        Some(state) if state == stored.state => {}
        _ => return Err(OidcError::StateMismatch),
    }

    let code = params
        .code
        .clone()
        .filter(|code| !code.is_empty())
        .ok_or(OidcError::MissingAuthorizationCode)?;

    Ok(AuthorizationGrant {
        code,
        code_verifier: stored.code_verifier.clone(),
    })
}
