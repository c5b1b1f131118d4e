/// Current user endpoints
///
/// # Endpoints
///
/// - `GET /api/users` - The authenticated user, without the password hash
/// - `PUT /api/users` - Update profile fields
/// - `POST /api/avatar-upload` - Upload an avatar (multipart field `avatar`)
/// - `DELETE /api/avatar` - Remove the avatar
///
/// Avatars are written to the configured uploads directory as
/// `<user_id>-<unix_millis>.<ext>` and served from `/uploads/`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::MessageResponse,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use bytes::BytesMut;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use taskdeck_shared::{
    auth::gate::AuthContext,
    models::user::{UpdateProfile, User},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Multipart field holding the avatar
pub const AVATAR_FIELD: &str = "avatar";

/// Accepted avatar file extensions
pub const AVATAR_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// URL prefix avatars are served under
const UPLOADS_URL_PREFIX: &str = "/uploads/";

/// Profile update request
///
/// Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
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

impl From<UpdateProfileRequest> for UpdateProfile {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
            phone: req.phone,
            website: req.website,
        }
    }
}

/// Profile update response
#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: User,
}

/// Avatar upload response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// Get the authenticated user
///
/// # Errors
///
/// - `404 Not Found`: The token's user no longer exists
pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<User>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(user))
}

/// Update profile fields of the authenticated user
///
/// # Errors
///
/// - `400 Bad Request`: No fields given, or a field is too long
/// - `404 Not Found`: The token's user no longer exists
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    req.validate()?;

    let update = UpdateProfile::from(req);
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let user = state
        .store
        .update_profile(auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(user_id = %user.id, "Profile updated");

    Ok(Json(UpdateProfileResponse {
        message: "User updated".to_string(),
        user,
    }))
}

/// Upload a new avatar
///
/// # Endpoint
///
/// ```text
/// POST /api/avatar-upload
/// Content-Type: multipart/form-data; boundary=...
///
/// avatar=<file>
/// ```
///
/// # Response
///
/// ```json
/// { "avatarUrl": "/uploads/<user_id>-<millis>.png" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: No `avatar` file, empty file, or unsupported extension
/// - `413 Payload Too Large`: File exceeds the configured limit
/// - `404 Not Found`: The token's user no longer exists
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let max_bytes = state.config.storage.max_avatar_bytes;
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let extension = field
            .file_name()
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))
            .and_then(avatar_extension)?;

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Avatar must be at most {} bytes",
                    max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some((extension, data.freeze()));
        break;
    }

    let (extension, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let previous = load_user(&state, auth.user_id).await?.avatar_url;

    let uploads_dir = &state.config.storage.uploads_dir;
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to create uploads directory: {}", e)))?;

    let file_name = format!(
        "{}-{}.{}",
        auth.user_id,
        Utc::now().timestamp_millis(),
        extension
    );
    tokio::fs::write(uploads_dir.join(&file_name), &data)
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to write avatar: {}", e)))?;

    let avatar_url = format!("{}{}", UPLOADS_URL_PREFIX, file_name);
    let stored = state
        .store
        .set_avatar_url(auth.user_id, Some(avatar_url.clone()))
        .await
        .map_err(ApiError::from)
        .and_then(|user| user.ok_or_else(|| ApiError::NotFound("User not found".to_string())));
    if let Err(e) = stored {
        remove_avatar_file(uploads_dir, &avatar_url).await;
        return Err(e);
    }

    if let Some(previous) = previous {
        remove_avatar_file(uploads_dir, &previous).await;
    }

    info!(user_id = %auth.user_id, bytes = data.len(), "Avatar uploaded");

    Ok(Json(AvatarResponse { avatar_url }))
}

/// Remove the avatar of the authenticated user
///
/// Succeeds when there is no avatar to remove.
pub async fn delete_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MessageResponse>> {
    let previous = load_user(&state, auth.user_id).await?.avatar_url;

    state
        .store
        .set_avatar_url(auth.user_id, None)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Some(previous) = previous {
        remove_avatar_file(&state.config.storage.uploads_dir, &previous).await;
    }

    Ok(Json(MessageResponse::new("Avatar removed")))
}

async fn load_user(state: &AppState, user_id: Uuid) -> ApiResult<User> {
    state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Lowercased extension of an accepted avatar file name
fn avatar_extension(file_name: &str) -> ApiResult<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| AVATAR_EXTENSIONS.contains(&ext.as_str()));

    extension.ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unsupported file type; allowed: {}",
            AVATAR_EXTENSIONS.join(", ")
        ))
    })
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(err.body_text())
}

/// Deletes a stored avatar, logging instead of failing
async fn remove_avatar_file(uploads_dir: &Path, avatar_url: &str) {
    let Some(file_name) = avatar_url.strip_prefix(UPLOADS_URL_PREFIX) else {
        return;
    };
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.contains("..") {
        warn!(avatar_url, "Refusing to remove avatar outside the uploads directory");
        return;
    }

    match tokio::fs::remove_file(uploads_dir.join(file_name)).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(avatar_url, error = %e, "Failed to remove avatar file"),
    }
}
