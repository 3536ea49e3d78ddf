// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use relief_api::{
    auth::{AuthService, InMemorySessionStore},
    config::AppConfig,
    events,
    handlers::AppServices,
    logging,
    store::{memory::InMemoryStore, seed},
    AppState,
};

/// Helper harness spinning up the full application router over a fresh
/// in-memory store with zero simulated latency.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with seeded demo state.
    pub async fn new() -> Self {
        let cfg = AppConfig::new("127.0.0.1", 18_080, "test");

        let store = Arc::new(InMemoryStore::new());
        seed::seed_demo_data(&store).await.expect("seeding failed");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(
            seed::demo_accounts(),
            Arc::new(InMemorySessionStore::new()),
        ));

        let services = AppServices::new(
            store.clone(),
            event_sender.clone(),
            logging::discard_logger(),
        );

        let state = AppState {
            config: cfg,
            store,
            event_sender,
            services,
            auth: auth_service.clone(),
        };

        let router = Router::<AppState>::new()
            .route("/", get(|| async { "relief-api up" }))
            .nest("/api/v1", relief_api::api_v1_routes())
            .with_state(state.clone())
            .nest(
                "/auth",
                relief_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(axum::middleware::from_fn(
                relief_api::tracing::request_id_middleware,
            ));

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Logs in through the real endpoint and returns the session token.
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": seed::DEMO_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token missing").to_string()
    }

    pub async fn login_admin(&self) -> String {
        self.login("manager@relief.example").await
    }

    pub async fn login_member(&self) -> String {
        self.login("member@relief.example").await
    }

    /// Sends one request through the router and decodes the JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request build failed");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), None).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

/// Unwraps the standard `{ success, data }` envelope.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], Value::Bool(true), "unexpected envelope: {body}");
    &body["data"]
}
