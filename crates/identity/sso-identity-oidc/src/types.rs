//! Wire types for the provider endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sso_identity_core::UserIdentity;

/// Query parameters of the provider callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Validated callback, ready for the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub code_verifier: String,
}

/// Token endpoint response.
///
/// Only `access_token` is acted upon; the remaining fields are kept for callers
/// that want to inspect them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenExchangeResult {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Claims returned by the userinfo endpoint.
///
/// Gov.br sends the CPF as `sub`; some deployments use `cpf` instead, and
/// `avatar_url` in place of `picture`. Every claim is optional and read
/// leniently: a value of an unexpected JSON type counts as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfoClaims {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub profile: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub picture: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub email_verified: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub phone_number_verified: Option<bool>,
}

/// Strings as-is, numbers in their decimal form (CPFs sometimes arrive unquoted).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    })
}

/// Booleans, `"true"`/`"false"` strings and `1`/`0`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(value) => Some(value),
        Value::String(value) if value.eq_ignore_ascii_case("true") => Some(true),
        Value::String(value) if value.eq_ignore_ascii_case("false") => Some(false),
        Value::Number(value) => value.as_u64().map(|value| value == 1),
        _ => None,
    })
}

impl From<UserInfoClaims> for UserIdentity {
    fn from(claims: UserInfoClaims) -> Self {
        UserIdentity {
            subject: claims.sub.or(claims.cpf).unwrap_or_default(),
            display_name: claims.name.unwrap_or_default(),
            profile_url: claims.profile,
            picture_url: claims.picture.or(claims.avatar_url),
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
            phone_number: claims.phone_number,
            phone_number_verified: claims.phone_number_verified.unwrap_or(false),
        }
    }
}

/// Raw photo bytes from the provider.
#[derive(Debug, Clone)]
pub struct UserPhoto {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_missing_contact_fields() {
        let claims: UserInfoClaims =
            serde_json::from_str(r#"{"sub": "123", "name": "Jane"}"#).unwrap();
        let identity = UserIdentity::from(claims);

        assert_eq!(identity.subject, "123");
        assert_eq!(identity.display_name, "Jane");
        assert_eq!(identity.email, None);
        assert!(!identity.email_verified);
        assert_eq!(identity.phone_number, None);
        assert!(!identity.phone_number_verified);
    }

    #[test]
    fn test_claims_fallback_fields() {
        let claims: UserInfoClaims = serde_json::from_str(
            r#"{
                "cpf": "98765432100",
                "avatar_url": "https://sso.example.gov.br/userinfo/picture",
                "email": "joao@example.com",
                "email_verified": true,
                "phone_number": "+5561999990000",
                "phone_number_verified": true,
                "amr": ["passwd"]
            }"#,
        )
        .unwrap();
        let identity = UserIdentity::from(claims);

        assert_eq!(identity.subject, "98765432100");
        assert_eq!(identity.display_name, "");
        assert_eq!(
            identity.picture_url.as_deref(),
            Some("https://sso.example.gov.br/userinfo/picture")
        );
        assert!(identity.email_verified);
        assert!(identity.phone_number_verified);
    }

    #[test]
    fn test_sub_wins_over_cpf() {
        let claims: UserInfoClaims =
            serde_json::from_str(r#"{"sub": "111", "cpf": "222", "picture": "a", "avatar_url": "b"}"#)
                .unwrap();
        let identity = UserIdentity::from(claims);
        assert_eq!(identity.subject, "111");
        assert_eq!(identity.picture_url.as_deref(), Some("a"));
    }

    #[test]
    fn test_claims_with_string_verified_flags() {
        let claims: UserInfoClaims = serde_json::from_str(
            r#"{"sub": "123", "name": "Jane", "email_verified": "true", "phone_number_verified": "False"}"#,
        )
        .unwrap();
        let identity = UserIdentity::from(claims);

        assert_eq!(identity.subject, "123");
        assert!(identity.email_verified);
        assert!(!identity.phone_number_verified);
    }

    #[test]
    fn test_claims_with_numeric_subject() {
        let claims: UserInfoClaims =
            serde_json::from_str(r#"{"sub": 12345678900, "name": "Jane"}"#).unwrap();
        let identity = UserIdentity::from(claims);

        assert_eq!(identity.subject, "12345678900");
        assert_eq!(identity.display_name, "Jane");
    }

    #[test]
    fn test_unreadable_claims_fall_back() {
        let claims: UserInfoClaims = serde_json::from_str(
            r#"{
                "sub": null,
                "cpf": {"value": "1"},
                "name": ["Jane"],
                "email": true,
                "email_verified": "maybe",
                "phone_number_verified": null
            }"#,
        )
        .unwrap();
        let identity = UserIdentity::from(claims);

        assert_eq!(identity.subject, "");
        assert_eq!(identity.display_name, "");
        assert_eq!(identity.email, None);
        assert!(!identity.email_verified);
        assert!(!identity.phone_number_verified);
    }

    #[test]
    fn test_token_response_optional_fields() {
        let token: TokenExchangeResult =
            serde_json::from_str(r#"{"access_token": "t1", "token_type": "Bearer"}"#).unwrap();
        assert_eq!(token.access_token, "t1");
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
        assert_eq!(token.id_token, None);
    }
}
