use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::state::AppState;
use crate::{auth, db, tasks};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(tasks::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
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

/// Connects to the store, applies migrations and serves until shutdown.
pub async fn serve(config: crate::config::AppConfig) -> anyhow::Result<()> {
    let pool = db::connect(&config).await?;

    db::run_migrations(&pool).await?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::from_pool(pool, config)?;

    spawn_session_sweeper(state.clone());

    let app = build_app(state);
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn spawn_session_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.session_sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = auth::services::sweep_sessions(&state).await {
                error!(error = %e, "session sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn signup(app: &Router, username: &str, password: &str) -> String {
        let (status, _) = call(
            app,
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "username": username, "password": password, "email": format!("{username}@x.com") })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(
            app,
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn end_to_end_session_lifecycle() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "username": "alice", "password": "pw123", "email": "a@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let alice_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "username": "alice", "password": "pw123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, task) = call(
            &app,
            Method::POST,
            "/todos/",
            Some(&token),
            Some(json!({ "title": "buy milk" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["title"], "buy milk");
        assert_eq!(task["completed"], false);
        assert_eq!(task["owner_id"], alice_id.as_str());

        let (status, list) = call(&app, Method::GET, "/todos/", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["id"], task["id"]);

        let (status, _) = call(&app, Method::POST, "/user/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/todos/", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "token revoked or unknown");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/todos", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "no token");

        let (status, body) = call(&app, Method::GET, "/todos", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid token");
    }

    #[tokio::test]
    async fn register_conflict_and_validation() {
        let app = build_app(AppState::fake());
        signup(&app, "alice", "pw123").await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "username": "alice", "password": "pw999", "email": "z@x.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (status, body) = call(
            &app,
            Method::POST,
            "/user/register",
            None,
            Some(json!({ "username": "bob", "password": "pw123", "email": "not-an-email" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "email");

        let (status, body) = call(&app, Method::POST, "/user/register", None, Some(json!({ "username": "bob" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bad_login_is_401() {
        let app = build_app(AppState::fake());
        signup(&app, "alice", "pw123").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/user/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid username or password");
    }

    #[tokio::test]
    async fn tasks_are_isolated_between_users() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice", "pw123").await;
        let bob = signup(&app, "bob", "pw456").await;

        let (_, task) = call(&app, Method::POST, "/todos", Some(&alice), Some(json!({ "title": "secret" }))).await;
        let uri = format!("/todos/{}", task["id"].as_str().unwrap());

        let (status, list) = call(&app, Method::GET, "/todos", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(list.as_array().unwrap().is_empty());

        for (method, body) in [
            (Method::GET, None),
            (Method::PUT, Some(json!({ "completed": true }))),
            (Method::DELETE, None),
        ] {
            let (status, body) = call(&app, method, &uri, Some(&bob), body).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "task not found");
        }

        let (status, still) = call(&app, Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(still["completed"], false);
    }

    #[tokio::test]
    async fn client_supplied_owner_is_ignored() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice", "pw123").await;
        let (_, me) = call(&app, Method::GET, "/user/me", Some(&alice), None).await;

        let (status, task) = call(
            &app,
            Method::POST,
            "/todos",
            Some(&alice),
            Some(json!({ "title": "mine", "owner_id": uuid::Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(task["owner_id"], me["id"]);
    }

    #[tokio::test]
    async fn partial_update_and_delete_over_http() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice", "pw123").await;
        let (_, task) = call(&app, Method::POST, "/todos", Some(&alice), Some(json!({ "title": "buy milk" }))).await;
        let uri = format!("/todos/{}", task["id"].as_str().unwrap());

        let (status, updated) = call(&app, Method::PUT, &uri, Some(&alice), Some(json!({ "completed": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "buy milk");
        assert_eq!(updated["completed"], true);

        let (status, body) = call(&app, Method::PUT, &uri, Some(&alice), Some(json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "title");

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_ids_are_400() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice", "pw123").await;

        let (status, body) = call(&app, Method::GET, "/todos/not-a-uuid", Some(&alice), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "id");

        let (status, _) = call(&app, Method::GET, "/user/details/123", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_details_lookup() {
        let app = build_app(AppState::fake());
        let alice = signup(&app, "alice", "pw123").await;
        let (_, me) = call(&app, Method::GET, "/user/me", Some(&alice), None).await;
        let uri = format!("/user/details/{}", me["id"].as_str().unwrap());

        let (status, details) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(details["username"], "alice");
        assert_eq!(details["email"], "alice@x.com");
        assert!(details.get("password_hash").is_none());

        let uri = format!("/user/details/{}", uuid::Uuid::new_v4());
        let (status, _) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
