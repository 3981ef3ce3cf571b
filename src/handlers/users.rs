use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::ApiError;
use crate::models::{
    new_object_id, ChangePasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest, User,
    UserUpdate, UserView,
};
use crate::password::PasswordHasher;
use crate::store::Store;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// Unknown email and wrong password answer with the same 401.
#[post("/api/users/login")]
pub(crate) async fn login(
    store: web::Data<Store>,
    hasher: web::Data<PasswordHasher>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { email, password } = body.into_inner();

    let user = store
        .run(store.users.find_by_email(&email))
        .await
        .map_err(ApiError::store("Failed to fetch user"))?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !hasher.verify(password, user.password.clone()).await {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(user) })))
}

#[post("/api/users/register")]
pub(crate) async fn register(
    store: web::Data<Store>,
    hasher: web::Data<PasswordHasher>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let RegisterRequest {
        name,
        email,
        password,
        address,
    } = body.into_inner();

    let password = hasher.hash(password).await?;
    let now = Utc::now();
    let user = User {
        id: new_object_id(),
        name,
        email,
        password,
        address,
        is_admin: false,
        is_blocked: false,
        created_at: now,
        updated_at: now,
    };

    store
        .run(store.users.insert(&user))
        .await
        .map_err(ApiError::store("Failed to create user"))?;

    log::info!("registered user {}", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "User registered successfully",
        "user": UserView::from(user),
    })))
}

/// Name, email and address only. Password and flags are left alone.
#[put("/api/users/updateProfile")]
pub(crate) async fn update_profile(
    store: web::Data<Store>,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    store
        .run(store.users.update_profile(&body, Utc::now()))
        .await
        .map_err(ApiError::store("Failed to update profile"))?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Profile updated successfully" })))
}

#[put("/api/users/changePassword")]
pub(crate) async fn change_password(
    store: web::Data<Store>,
    hasher: web::Data<PasswordHasher>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let ChangePasswordRequest {
        user_id,
        old_password,
        new_password,
    } = body.into_inner();

    let user = store
        .run(store.users.find_by_id(&user_id))
        .await
        .map_err(ApiError::store("Failed to fetch user"))?
        .ok_or_else(user_not_found)?;

    if !hasher.verify(old_password, user.password).await {
        return Err(ApiError::Unauthorized("Old password is incorrect".to_string()));
    }

    let hash = hasher.hash(new_password).await?;
    store
        .run(store.users.update_password(&user_id, &hash, Utc::now()))
        .await
        .map_err(ApiError::store("Failed to change password"))?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

/// Users whose name matches `search_term`, case-insensitively.
#[get("/api/users/getAll/{search_term}")]
pub(crate) async fn get_all(
    store: web::Data<Store>,
    search_term: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let users: Vec<UserView> = store
        .run(store.users.search_by_name(&search_term))
        .await
        .map_err(ApiError::store("Failed to fetch users"))?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[put("/api/users/toggleBlock/{user_id}")]
pub(crate) async fn toggle_block(
    store: web::Data<Store>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let is_blocked = store
        .run(store.users.toggle_blocked(&user_id, Utc::now()))
        .await
        .map_err(ApiError::store("Failed to toggle block status"))?
        .ok_or_else(user_not_found)?;

    log::info!("user {} blocked: {is_blocked}", user_id.as_str());
    Ok(HttpResponse::Ok().json(json!({
        "message": "User block status updated",
        "isBlocked": is_blocked,
    })))
}

#[get("/api/users/getById/{user_id}")]
pub(crate) async fn get_by_id(
    store: web::Data<Store>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = store
        .run(store.users.find_by_id(&user_id))
        .await
        .map_err(ApiError::store("Failed to fetch user"))?
        .ok_or_else(user_not_found)?;
    Ok(HttpResponse::Ok().json(json!({ "user": UserView::from(user) })))
}

/// Admin update, also sets the role and block flags.
#[put("/api/users/update")]
pub(crate) async fn update_user(
    store: web::Data<Store>,
    body: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    store
        .run(store.users.update_user(&body, Utc::now()))
        .await
        .map_err(ApiError::store("Failed to update user"))?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User updated successfully" })))
}
