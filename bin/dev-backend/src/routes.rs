//! Handlers for the two OAuth2 endpoints the console calls.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use harbor_oauth_relay::{AuthResponse, AuthUrlResponse, OAuth2LoginRequest, OAuthProvider};
use oauth2::{CsrfToken, Scope};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use ulid::Ulid;

use crate::AppState;
use crate::config::scopes;
use crate::error::ApiError;

/// Query parameters for the authorization URL endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthUrlQuery {
    #[serde(default)]
    redirect_uri: String,
}

fn parse_provider(name: &str) -> Result<OAuthProvider, ApiError> {
    name.parse().map_err(|_| ApiError::UnknownProvider {
        provider: name.to_string(),
    })
}

/// `GET /api/v1/auth/oauth2/{provider}/url`
///
/// Returns the provider's authorization URL for the registered redirect URI.
#[instrument(skip_all)]
pub async fn authorization_url(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<AuthUrlQuery>,
) -> Result<Json<AuthUrlResponse>, ApiError> {
    let provider = parse_provider(&provider)?;
    if query.redirect_uri != state.config().redirect_uri {
        return Err(ApiError::RedirectUriMismatch);
    }

    let (url, _csrf) = state
        .client(provider)
        .authorize_url(CsrfToken::new_random)
        .add_scopes(scopes(provider).iter().map(|s| Scope::new((*s).to_string())))
        .url();
    debug!(%provider, "issued authorization URL");

    Ok(Json(AuthUrlResponse {
        auth_url: url.to_string(),
    }))
}

/// `POST /api/v1/auth/oauth2/login`
///
/// Accepts any non-empty code that does not start with `denied` and signs
/// in the provider's fixture user with a fresh token.
#[instrument(skip_all)]
pub async fn oauth2_login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<OAuth2LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidRequest {
        reason: e.body_text(),
    })?;

    if request.redirect_uri != state.config().redirect_uri {
        return Err(ApiError::RedirectUriMismatch);
    }
    if request.code.is_empty() {
        return Err(ApiError::MissingCode);
    }
    if request.code.starts_with("denied") {
        return Err(ApiError::Denied);
    }

    let user = state.fixture_user(request.provider);
    let access_token = format!("dev_{}", Ulid::new().to_string().to_lowercase());
    info!(provider = %request.provider, user_id = %user.id(), "signed in fixture user");

    Ok(Json(AuthResponse::succeeded(user, access_token)))
}

#[cfg(test)]
mod tests {
    use crate::{AppState, app, config::DevBackendConfig};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use harbor_oauth_relay::{AuthResponse, AuthUrlResponse};
    use harbor_platform_access::{AuthProvider, Role};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    const CALLBACK: &str = "http://localhost:3000/auth/callback";

    fn router() -> Router {
        app(AppState::new(DevBackendConfig::default()).expect("state"))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_login(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/oauth2/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn encoded(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    #[tokio::test]
    async fn authorization_url_for_github() {
        let uri = format!(
            "/api/v1/auth/oauth2/github/url?redirect_uri={}",
            encoded(CALLBACK)
        );
        let (status, body) = send(router(), get(&uri)).await;

        assert_eq!(status, StatusCode::OK);
        let body: AuthUrlResponse = serde_json::from_value(body).expect("auth url body");
        let url = Url::parse(&body.auth_url).expect("auth url");
        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };
        assert_eq!(param("response_type").as_deref(), Some("code"));
        assert_eq!(param("client_id").as_deref(), Some("harbor-console-dev"));
        assert_eq!(param("redirect_uri").as_deref(), Some(CALLBACK));
        assert_eq!(param("scope").as_deref(), Some("read:user user:email"));
        assert!(param("state").is_some());
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let uri = format!(
            "/api/v1/auth/oauth2/gitlab/url?redirect_uri={}",
            encoded(CALLBACK)
        );
        let (status, body) = send(router(), get(&uri)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "unknown provider 'gitlab'" }));
    }

    #[tokio::test]
    async fn authorization_url_rejects_other_redirect() {
        let uri = format!(
            "/api/v1/auth/oauth2/google/url?redirect_uri={}",
            encoded("http://localhost:3000/console/auth/callback")
        );
        let (status, body) = send(router(), get(&uri)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "redirect_uri mismatch");
    }

    #[tokio::test]
    async fn login_issues_fixture_session() {
        let (status, body) = send(
            router(),
            post_login(json!({
                "provider": "google",
                "code": "4/0Abc",
                "redirect_uri": CALLBACK
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let response: AuthResponse = serde_json::from_value(body).expect("login body");
        assert!(response.success);
        let user = response.user.expect("user");
        assert_eq!(user.auth_provider(), AuthProvider::Google);
        assert_eq!(user.role(), Role::Developer);
        assert!(user.is_verified());
        assert!(response.access_token.expect("access token").starts_with("dev_"));
    }

    #[tokio::test]
    async fn login_tokens_are_fresh() {
        let body = json!({ "provider": "github", "code": "c", "redirect_uri": CALLBACK });
        let (_, first) = send(router(), post_login(body.clone())).await;
        let (_, second) = send(router(), post_login(body)).await;

        assert_ne!(first["access_token"], second["access_token"]);
        assert_eq!(first["user"]["id"], second["user"]["id"]);
    }

    #[tokio::test]
    async fn login_redirect_mismatch() {
        let (status, body) = send(
            router(),
            post_login(json!({
                "provider": "github",
                "code": "abc",
                "redirect_uri": "http://evil.example.com/auth/callback"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "success": false, "message": "redirect_uri mismatch" }));
    }

    #[tokio::test]
    async fn login_requires_code() {
        let (status, body) = send(
            router(),
            post_login(json!({ "provider": "github", "code": "", "redirect_uri": CALLBACK })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn denied_code_is_unauthorized() {
        let (status, body) = send(
            router(),
            post_login(json!({
                "provider": "google",
                "code": "denied-by-user",
                "redirect_uri": CALLBACK
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_provider_in_body_is_bad_request() {
        let (status, body) = send(
            router(),
            post_login(json!({ "provider": "gitlab", "code": "abc", "redirect_uri": CALLBACK })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn fixture_role_is_configurable() {
        let config = DevBackendConfig {
            fixture_role: Role::Owner,
            ..DevBackendConfig::default()
        };
        let router = app(AppState::new(config).expect("state"));
        let (_, body) = send(
            router,
            post_login(json!({ "provider": "github", "code": "abc", "redirect_uri": CALLBACK })),
        )
        .await;

        assert_eq!(body["user"]["role"], "owner");
    }
}
