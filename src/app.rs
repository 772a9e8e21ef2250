use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{attendance, auth, images, posts, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .merge(users::router())
        .merge(attendance::router())
        .merge(posts::router())
        .merge(images::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Attendance API!" }))
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
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().method(Method::GET).uri(uri);
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    fn post_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn signup(app: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            json_req(
                Method::POST,
                "/signup",
                json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "address": "1 Main",
                    "city": "Lahore"
                }),
            ),
        )
        .await
    }

    async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            json_req(
                Method::POST,
                "/login",
                json!({ "email": email, "password": password }),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn home_and_health() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, get_req("/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to the Attendance API!");

        let res = app.clone().oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signup_and_login_status_mapping() {
        let app = build_app(AppState::fake());

        let (status, body) = signup(&app, "Ana", "ana@x.com", "secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ana@x.com");
        assert_eq!(body["city"], "Lahore");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, body) = signup(&app, "Ana", "ana@x.com", "secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "User already exists");

        let (status, body) = login(&app, "ana@x.com", "secret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ana");
        assert_eq!(body["address"], "1 Main");

        let (status, _) = login(&app, "ana@x.com", "wrong").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = login(&app, "ghost@x.com", "secret").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "User not found");
    }

    #[tokio::test]
    async fn signup_requires_fields() {
        let app = build_app(AppState::fake());
        let (status, body) = signup(&app, "Ana", "ana@x.com", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "password is required");
    }

    #[tokio::test]
    async fn me_requires_valid_bearer() {
        let app = build_app(AppState::fake());
        let (_, body) = signup(&app, "Ana", "ana@x.com", "secret").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get_req("/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ana");
        assert!(body.get("password_hash").is_none());

        let (status, _) = send(&app, get_req("/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut tampered = token.into_bytes();
        let idx = tampered.len() - 5;
        tampered[idx] = if tampered[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        let (status, body) = send(&app, get_req("/me", Some(&tampered))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid token signature");
    }

    #[tokio::test]
    async fn attendance_marking_and_listing() {
        let app = build_app(AppState::fake());
        let (_, body) = signup(&app, "Ana", "ana@x.com", "secret").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&app, get_req("/attendance/ana@x.com", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, post_with_token("/mark_attendance", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Attendance marked for Ana");
        assert_eq!(body["time"].as_str().unwrap().len(), "2024-01-01 00:00:00".len());

        let (status, body) = send(&app, get_req("/attendance/ana@x.com", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_records"], 1);
        assert_eq!(body["attendance"][0]["name"], "Ana");

        let (_, body) = send(&app, get_req("/attendance/count", None)).await;
        assert_eq!(body["total_attendance_records"], 1);
    }

    #[tokio::test]
    async fn marking_for_deleted_user_is_not_found() {
        let app = build_app(AppState::fake());
        let (_, body) = signup(&app, "Ana", "ana@x.com", "secret").await;
        let token = body["token"].as_str().unwrap().to_string();

        let del = Request::builder()
            .method(Method::DELETE)
            .uri("/users/ana@x.com")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, del).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, post_with_token("/mark_attendance", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_management_endpoints() {
        let app = build_app(AppState::fake());
        signup(&app, "Ali Hassan", "ali@x.com", "pw1").await;
        signup(&app, "Sara", "sara@x.com", "pw2").await;

        let (_, body) = send(&app, get_req("/users", None)).await;
        assert_eq!(body["total_users"], 2);
        assert!(body["users"][0].get("password_hash").is_none());

        let (_, body) = send(&app, get_req("/users/count", None)).await;
        assert_eq!(body["total_users"], 2);

        let (status, body) = send(&app, get_req("/users/filter/hass", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"][0]["email"], "ali@x.com");

        let (status, _) = send(&app, get_req("/users/filter/nobody", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            json_req(Method::PUT, "/users/sara@x.com", json!({ "name": "Sara" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Name is already the same, nothing changed");

        let (_, body) = send(
            &app,
            json_req(Method::PUT, "/users/sara@x.com", json!({ "name": "Sarah" })),
        )
        .await;
        assert_eq!(body["message"], "User 'sara@x.com' name updated to 'Sarah'");

        let (status, _) = send(
            &app,
            json_req(Method::PUT, "/users/ghost@x.com", json!({ "name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let del = || {
            Request::builder()
                .method(Method::DELETE)
                .uri("/users/sara@x.com")
                .body(Body::empty())
                .unwrap()
        };
        let (status, body) = send(&app, del()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User 'sara@x.com' deleted successfully");
        let (status, _) = send(&app, del()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn posts_create_and_lookup() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/post",
                json!({
                    "name": "Ana",
                    "email": "ana@x.com",
                    "postText": "hello",
                    "address": "1 Main",
                    "city": "Lahore"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["_id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get_req("/post/Ana", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_id"], id.as_str());
        assert_eq!(body["postText"], "hello");

        let (status, _) = send(&app, get_req("/post/Nobody", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn multipart_req(field: &str) -> Request<Body> {
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNGDATA\r\n\
             --{boundary}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri("/images")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn image_upload_returns_key_and_url() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, multipart_req("file")).await;
        assert_eq!(status, StatusCode::OK);
        let key = body["key"].as_str().unwrap();
        assert!(key.starts_with("uploads/") && key.ends_with(".png"));
        assert!(body["url"].as_str().unwrap().contains(key));

        let (status, _) = send(&app, multipart_req("other")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn image_upload_without_storage_is_unavailable() {
        let state = AppState {
            storage: None,
            ..AppState::fake()
        };
        let app = build_app(state);
        let (status, body) = send(&app, multipart_req("file")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Image storage is not configured");
    }
}
