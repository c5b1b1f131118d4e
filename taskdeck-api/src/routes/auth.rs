/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/signup` - Register a new user
/// - `POST /api/login` - Check credentials and set the session cookie
/// - `GET|POST /api/logout` - Clear the session cookie
/// - `GET /api/verifytoken` - Return the claims of the presented token
///
/// Signup, login and logout are public; `verifytoken` sits behind the gate.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::MessageResponse,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::{
        gate::{cleared_session_cookie, session_cookie},
        jwt::{self, Claims},
        password,
    },
    models::user::CreateUser,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password, 8 to 128 characters
    pub password: String,

    #[serde(alias = "first_name")]
    #[validate(length(max = 100, message = "First name must be at most 100 characters"))]
    pub first_name: Option<String>,

    #[serde(alias = "last_name")]
    #[validate(length(max = 100, message = "Last name must be at most 100 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 100, message = "Company must be at most 100 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 100, message = "Phone must be at most 100 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Website must be at most 100 characters"))]
    pub website: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signup and login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub message: String,

    pub user_id: Uuid,
}

/// Token check response
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    pub message: String,

    /// Decoded token claims
    pub payload: Claims,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/signup
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "longpass1",
///   "firstName": "Ada"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    password::validate_password(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password_async(req.password).await?;

    let user = state
        .store
        .create_user(CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
            phone: req.phone,
            website: req.website,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User registered successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Login and receive the session cookie
///
/// # Endpoint
///
/// ```text
/// POST /api/login
/// Content-Type: application/json
///
/// { "email": "user@example.com", "password": "longpass1" }
/// ```
///
/// On success the response carries
/// `Set-Cookie: authToken=...; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600`.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Wrong password
/// - `404 Not Found`: Unknown email
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Email not found".to_string()))?;

    let matches =
        password::verify_password_async(req.password, user.password_hash).await?;
    if !matches {
        info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized("Wrong password".to_string()));
    }

    let ttl = state.config.jwt.ttl_seconds;
    let expires_in = Duration::try_seconds(ttl)
        .ok_or_else(|| ApiError::InternalError(format!("Token lifetime out of range: {}s", ttl)))?;
    let claims = Claims::with_expiration(user.id, user.email, expires_in);
    let token = jwt::create_token(&claims, state.jwt_secret())?;
    let cookie = session_cookie(&token, ttl, state.secure_cookies());

    info!(user_id = %user.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            message: "Login successful".to_string(),
            user_id: user.id,
        }),
    ))
}

/// Clear the session cookie
///
/// The token itself stays valid until it expires; the client just loses it.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cleared_session_cookie(state.secure_cookies()))],
        Json(MessageResponse::new("Logged out successfully")),
    )
}

/// Return the claims of the presented token
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, or expired token
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<VerifyTokenResponse>> {
    let claims = state.gate.require(&headers)?;

    Ok(Json(VerifyTokenResponse {
        message: "Token is valid".to_string(),
        payload: claims,
    }))
}
