/*!
 * # Authentication and Session Module
 *
 * Session-token authentication against a durable session store. A login
 * issues an opaque token and writes the user object under the fixed session
 * key namespace; middleware resolves the bearer token back into a
 * [`CurrentUser`] for handlers. Role checks (administrator vs committee
 * member) gate mutation routes via [`AuthRouterExt`].
 */

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::Committee;

pub mod session;

pub use session::{
    FileSessionStore, InMemorySessionStore, SessionStore, SessionStoreError, SESSION_KEY_PREFIX,
};

const SESSION_TOKEN_LENGTH: usize = 40;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Full visibility and mutation rights.
    Administrator,
    /// Sees and may edit only rows of their own committee.
    CommitteeMember,
}

/// The session user object persisted in the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub storeroom: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committee: Option<Committee>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    /// Administrators see everything; members only their own committee.
    pub fn can_access_committee(&self, committee: Committee) -> bool {
        self.is_admin() || self.committee == Some(committee)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginCredentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing or invalid session token")]
    MissingSession,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("session store error: {0}")]
    SessionStore(String),
}

impl From<SessionStoreError> for AuthError {
    fn from(err: SessionStoreError) -> Self {
        AuthError::SessionStore(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message) = match &self {
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                self.to_string(),
            ),
            Self::MissingSession => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_SESSION",
                self.to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "AUTH_VALIDATION", msg.clone()),
            Self::SessionStore(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_SESSION_STORE_ERROR",
                "session store error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// A user account known to the service: the session user plus a password hash.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user: User,
    password_hash: String,
}

impl UserAccount {
    pub fn new(user: User, password: &str) -> Self {
        Self {
            user,
            password_hash: hash_password(password),
        }
    }
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Authentication service: credential checks plus session lifecycle.
pub struct AuthService {
    accounts: Vec<UserAccount>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(accounts: Vec<UserAccount>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { accounts, sessions }
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionResponse, AuthError> {
        credentials
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let password_hash = hash_password(&credentials.password);
        let account = self
            .accounts
            .iter()
            .find(|account| {
                account.user.email.eq_ignore_ascii_case(&credentials.email)
                    && account.password_hash == password_hash
            })
            .ok_or(AuthError::InvalidCredentials)?;

        let token = generate_token();
        self.sessions.put(&token, &account.user).await?;
        debug!(user = %account.user.email, "session created");

        Ok(SessionResponse {
            token,
            user: account.user.clone(),
        })
    }

    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.remove(token).await?;
        Ok(())
    }

    pub async fn current_user(&self, token: &str) -> Result<User, AuthError> {
        self.sessions
            .get(token)
            .await?
            .ok_or(AuthError::MissingSession)
    }
}

/// The authenticated user, injected into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("missing session".to_string()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Resolves the bearer token into a [`CurrentUser`] request extension.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => return AuthError::MissingSession.into_response(),
    };

    match auth_service.current_user(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Refuses non-administrators. Must run inside [`auth_middleware`].
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin() => next.run(request).await,
        Some(_) => {
            ServiceError::Forbidden("administrator role required".to_string()).into_response()
        }
        None => AuthError::MissingSession.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn require_admin(self) -> Self;
}

impl<S> AuthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn require_admin(self) -> Self {
        self.layer(axum::middleware::from_fn(admin_middleware))
            .with_auth()
    }
}

/// Authentication routes
pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
}

/// Log in and receive a session token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<SessionResponse>, AuthError> {
    let session = auth_service.login(&credentials).await?;
    Ok(Json(session))
}

/// Log out, removing the session from the durable store
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session removed"),
        (status = 401, description = "No session token supplied")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingSession)?;
    auth_service.logout(&token).await?;
    Ok(Json(
        serde_json::json!({ "message": "Successfully logged out" }),
    ))
}

/// The current session's user object
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user returned", body = User),
        (status = 401, description = "Not logged in")
    ),
    tag = "auth"
)]
pub async fn me_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<User>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingSession)?;
    let user = auth_service.current_user(&token).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> Vec<UserAccount> {
        vec![
            UserAccount::new(
                User {
                    email: "manager@relief.example".into(),
                    name: "Amal Haddad".into(),
                    role: Role::Administrator,
                    storeroom: "STR001".into(),
                    committee: None,
                },
                "123456",
            ),
            UserAccount::new(
                User {
                    email: "member@relief.example".into(),
                    name: "Farah Aziz".into(),
                    role: Role::CommitteeMember,
                    storeroom: "STR001".into(),
                    committee: Some(Committee::InKind),
                },
                "123456",
            ),
        ]
    }

    fn service() -> AuthService {
        AuthService::new(accounts(), Arc::new(InMemorySessionStore::new()))
    }

    #[tokio::test]
    async fn login_issues_a_resolvable_session() {
        let auth = service();
        let session = auth
            .login(&LoginCredentials {
                email: "manager@relief.example".into(),
                password: "123456".into(),
            })
            .await
            .unwrap();

        assert_eq!(session.token.len(), SESSION_TOKEN_LENGTH);
        let user = auth.current_user(&session.token).await.unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = service();
        let err = auth
            .login(&LoginCredentials {
                email: "manager@relief.example".into(),
                password: "hunter2".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn logout_removes_the_session() {
        let auth = service();
        let session = auth
            .login(&LoginCredentials {
                email: "member@relief.example".into(),
                password: "123456".into(),
            })
            .await
            .unwrap();

        auth.logout(&session.token).await.unwrap();
        assert!(matches!(
            auth.current_user(&session.token).await.unwrap_err(),
            AuthError::MissingSession
        ));
    }

    #[test]
    fn committee_access_is_role_scoped() {
        let admin = accounts()[0].user.clone();
        let member = accounts()[1].user.clone();

        assert!(admin.can_access_committee(Committee::Catering));
        assert!(member.can_access_committee(Committee::InKind));
        assert!(!member.can_access_committee(Committee::Catering));
    }
}
