use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::users;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/users", users::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::state::FakeStorage;
    use crate::users::repo_types::Role;

    fn access_token(state: &AppState, role: Role) -> String {
        JwtKeys::from_ref(state)
            .sign_access(Uuid::new_v4(), role)
            .expect("sign access")
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn multipart_body(boundary: &str, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"avatarFile\"; filename=\"a.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_clears_session_cookies() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/users/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let cookies: Vec<_> = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
        assert!(cookies.iter().any(|c| c.starts_with("isLoggedIn=")));
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));

        let body = body_json(resp.into_body()).await;
        assert_eq!(body["message"], "successfully logout");
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    // The fake state's pool never connects, so a 403 here proves the gate
    // fired before any repository access.
    #[tokio::test]
    async fn user_role_is_rejected_before_the_repository() {
        let state = AppState::fake();
        let token = access_token(&state, Role::User);
        let app = build_app(state);

        let resp = app
            .oneshot(
                Request::get("/users")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn refresh_token_cannot_authenticate() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_refresh(Uuid::new_v4(), Role::Admin)
            .expect("sign refresh");
        let app = build_app(state);

        let resp = app
            .oneshot(
                Request::get("/users/personal/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_before_lookup() {
        let state = AppState::fake();
        let token = access_token(&state, Role::Admin);
        let app = build_app(state);

        let resp = app
            .oneshot(
                Request::get("/users/getUser/not-a-valid-id")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp.into_body()).await;
        assert_eq!(body["message"], "Malformed user id");
    }

    #[tokio::test]
    async fn oversized_avatar_is_rejected_before_any_write() {
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::fake_with_storage(storage.clone());
        let token = access_token(&state, Role::User);
        let app = build_app(state);

        let boundary = "X-USERHUB-TEST";
        let body = multipart_body(boundary, &vec![0u8; 6 * 1024 * 1024]);
        let resp = app
            .oneshot(
                Request::put("/users/upload/avatarFile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn avatar_bytes_land_in_storage_with_a_derived_name() {
        let storage = Arc::new(FakeStorage::default());
        let state = AppState::fake_with_storage(storage.clone());
        let token = access_token(&state, Role::User);
        let app = build_app(state);

        let boundary = "X-USERHUB-TEST";
        let body = multipart_body(boundary, b"tiny-png");
        // The fake state has no usable database, so the request cannot
        // fully succeed; the storage write happens first and is what this
        // test observes.
        let _ = app
            .oneshot(
                Request::put("/users/upload/avatarFile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let puts = storage.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        let re = regex::Regex::new(r"^img/profiles/profile-[0-9a-f-]{36}-\d+\.png$").unwrap();
        assert!(re.is_match(&puts[0]), "unexpected key: {}", puts[0]);
    }

    #[tokio::test]
    async fn missing_avatar_field_is_a_bad_request() {
        let state = AppState::fake();
        let token = access_token(&state, Role::User);
        let app = build_app(state);

        let boundary = "X-USERHUB-TEST";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             value\r\n--{boundary}--\r\n"
        );
        let resp = app
            .oneshot(
                Request::put("/users/upload/avatarFile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp.into_body()).await;
        assert_eq!(body["message"], "avatarFile is required");
    }
}
