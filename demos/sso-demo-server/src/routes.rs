//! Web routes of the demo application.

use crate::error::AppError;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sso_identity_oidc::{AuthService, CallbackParams};
use sso_identity_session::{InMemorySessions, SessionHandle};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub const SESSION_COOKIE: &str = "sso_session";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthService>,
    pub sessions: InMemorySessions,
}

impl AppState {
    fn existing_session(&self, jar: &CookieJar) -> Option<SessionHandle> {
        jar.get(SESSION_COOKIE)
            .map(|cookie| self.sessions.handle(cookie.value()))
    }

    /// Session for this browser, issuing a cookie when there is none yet.
    fn session(&self, jar: CookieJar) -> (CookieJar, SessionHandle) {
        if let Some(session) = self.existing_session(&jar) {
            return (jar, session);
        }

        let session_id = InMemorySessions::new_session_id();
        let cookie = Cookie::build((SESSION_COOKIE, session_id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        (jar.add(cookie), self.sessions.handle(session_id))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/user", get(user_handler))
        .route("/user/photo", get(user_photo_handler))
        .route("/login", get(login_handler))
        .route("/openid", get(callback_handler))
        .route("/logout", get(logout_handler))
        .route("/logout/govbr", get(logout_landing_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn not_logged_in() -> Response {
    let body = serde_json::json!({
        "error": "User not logged in",
        "code": 401,
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

async fn index_handler() -> Redirect {
    Redirect::to("/user")
}

async fn user_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(session) = state.existing_session(&jar) else {
        return Ok(not_logged_in());
    };

    match state.auth.get_user(&session).await? {
        Some(identity) => Ok(Json(identity).into_response()),
        None => Ok(not_logged_in()),
    }
}

async fn user_photo_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(session) = state.existing_session(&jar) else {
        return Ok(not_logged_in());
    };

    let photo = state.auth.get_user_photo(&session).await?;
    Ok((
        [
            (CONTENT_TYPE, photo.content_type),
            (
                CONTENT_DISPOSITION,
                "inline; filename=\"user_photo.jpg\"".to_string(),
            ),
        ],
        photo.bytes,
    )
        .into_response())
}

async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let (jar, session) = state.session(jar);
    let login_url = state.auth.get_login_url(&session).await?;
    Ok((jar, Redirect::to(&login_url)))
}

async fn callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), AppError> {
    info!("Handling OAuth2 callback");
    let (jar, session) = state.session(jar);
    state.auth.handle_callback(&session, params).await?;
    Ok((jar, Redirect::to("/user")))
}

async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let (jar, session) = state.session(jar);
    let logout_url = state.auth.logout(&session).await?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Redirect::to(&logout_url)))
}

async fn logout_landing_handler() -> Redirect {
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use sso_identity_oidc::{AuthType, OidcConfig, build_auth_service};
    use std::collections::HashMap;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, Router) {
        let mock_server = MockServer::start().await;
        let config = OidcConfig::new(
            mock_server.uri(),
            "demo_client",
            "demo_secret",
            "http://localhost:8000/openid",
            "http://localhost:8000/logout/govbr",
        )
        .with_auth_type(AuthType::Pure);

        let state = AppState {
            auth: build_auth_service(config).unwrap(),
            sessions: InMemorySessions::default(),
        };
        (mock_server, create_router(state))
    }

    async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(response: &Response) -> String {
        response.headers()[LOCATION].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_user_requires_login() {
        let (_mock_server, router) = setup().await;

        let response = get(&router, "/user", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"error": "User not logged in", "code": 401})
        );
    }

    #[tokio::test]
    async fn test_index_redirects_to_user() {
        let (_mock_server, router) = setup().await;

        let response = get(&router, "/", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/user");
    }

    #[tokio::test]
    async fn test_login_callback_logout() {
        let (mock_server, router) = setup().await;

        let response = get(&router, "/login", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let authorize_url = location(&response);
        assert!(authorize_url.starts_with(&format!("{}/authorize?", mock_server.uri())));

        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        assert!(cookie.starts_with("sso_session="));

        let params: HashMap<String, String> = url::Url::parse(&authorize_url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "t1"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"sub": "123", "name": "Jane"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let callback_uri = format!("/openid?code=c1&state={}", params["state"]);
        let response = get(&router, &callback_uri, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/user");

        let response = get(&router, "/user", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let user = json_body(response).await;
        assert_eq!(user["subject"], "123");
        assert_eq!(user["display_name"], "Jane");
        assert_eq!(user["email"], serde_json::Value::Null);

        let response = get(&router, "/logout", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).contains("post_logout_redirect_uri="));

        let response = get(&router, "/user", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_provider_error_is_reported() {
        let (_mock_server, router) = setup().await;

        let response = get(
            &router,
            "/openid?error=access_denied&error_description=cancelled&state=s9",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "error": "access_denied",
                "error_description": "cancelled",
                "state": "s9"
            })
        );
    }

    #[tokio::test]
    async fn test_forged_callback_is_rejected() {
        let (mock_server, router) = setup().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let response = get(&router, "/openid?code=c1&state=forged", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], 400);
    }

    #[tokio::test]
    async fn test_photo_without_retention() {
        let (_mock_server, router) = setup().await;

        let response = get(&router, "/user/photo", Some("sso_session=unknown")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
