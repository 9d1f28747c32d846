use actix_web::{cookie::Cookie, http::StatusCode, web, HttpResponse};
use log::{info, warn};
use serde_json::json;

use super::{no_content, respond, respond_list};
use crate::{
    auth::{
        hash_password, hash_reset_token, logout_cookie, new_reset_token, require_role,
        session_cookie, verify_password, AuthUser,
    },
    error::AppError,
    models::{
        user::{
            normalize_email, validate_name, validate_new_password, AdminUserUpdate,
            ForgotPasswordRequest, LoginRequest, ProfileUpdate, ResetPasswordRequest, RoleUpdate,
            SignupRequest, UpdatePasswordRequest,
        },
        Role, User,
    },
    state::AppState,
};

/// A signed token for `user_id` and the cookie carrying it.
pub(crate) fn new_session(
    state: &AppState,
    user_id: &str,
) -> Result<(String, Cookie<'static>), AppError> {
    let token = state.tokens.issue(user_id)?;
    let cookie = session_cookie(
        &token,
        state.config.jwt_cookie_expires_in_days,
        state.config.is_production(),
    );
    Ok((token, cookie))
}

/// Issue a token for `user` and answer with it in both body and cookie.
fn send_token(state: &AppState, user: User, status: StatusCode) -> Result<HttpResponse, AppError> {
    let (token, cookie) = new_session(state, &user.id)?;
    Ok(HttpResponse::build(status).cookie(cookie).json(json!({
        "status": "success",
        "token": token,
        "data": { "user": user },
    })))
}

fn user_not_found() -> AppError {
    AppError::not_found("No user found with that ID")
}

/// New accounts always get the `user` role.
pub(crate) async fn register(state: &AppState, body: SignupRequest) -> Result<User, AppError> {
    let name = validate_name(&body.name)?;
    let email = normalize_email(&body.email)?;
    validate_new_password(&body.password, &body.password_confirm)?;

    let hash = hash_password(body.password, state.config.bcrypt_cost).await?;
    let user = state.db.insert_user(&name, &email, &hash, Role::User).await?;
    info!("[API] New signup: {}", user.id);
    Ok(user)
}

pub(crate) async fn authenticate(state: &AppState, body: LoginRequest) -> Result<User, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("please provide email and password"));
    }

    let incorrect = || AppError::unauthorized("incorrect email or password");
    let (user, credentials) = state
        .db
        .get_user_by_email(&body.email.trim().to_lowercase())
        .await?
        .filter(|(user, _)| user.active)
        .ok_or_else(incorrect)?;

    if !verify_password(body.password, credentials.password_hash).await? {
        return Err(incorrect());
    }
    Ok(user)
}

pub(crate) async fn change_password(
    state: &AppState,
    user: &User,
    body: UpdatePasswordRequest,
) -> Result<(), AppError> {
    let (_, credentials) = state
        .db
        .get_user_with_credentials(&user.id)
        .await?
        .ok_or_else(user_not_found)?;

    if !verify_password(body.password_current, credentials.password_hash).await? {
        return Err(AppError::unauthorized("Your current password is wrong."));
    }
    validate_new_password(&body.password, &body.password_confirm)?;

    let hash = hash_password(body.password, state.config.bcrypt_cost).await?;
    state.db.set_password(&user.id, &hash).await
}

/// Name, email and photo only.
pub(crate) async fn update_profile(
    state: &AppState,
    user: &User,
    body: ProfileUpdate,
) -> Result<User, AppError> {
    if body.password.is_some() || body.password_confirm.is_some() {
        return Err(AppError::bad_request(
            "This route is not for password updates. Please use /updateMyPassword.",
        ));
    }

    let name = body.name.as_deref().map(validate_name).transpose()?;
    let email = body.email.as_deref().map(normalize_email).transpose()?;
    state
        .db
        .update_user_profile(&user.id, name, email, body.photo)
        .await
}

pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let user = register(&state, body.into_inner()).await?;
    send_token(&state, user, StatusCode::CREATED)
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&state, body.into_inner()).await?;
    send_token(&state, user, StatusCode::OK)
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(logout_cookie())
        .json(json!({ "status": "success" }))
}

pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let email = body.email.trim().to_lowercase();
    let (user, _) = state
        .db
        .get_user_by_email(&email)
        .await?
        .filter(|(user, _)| user.active)
        .ok_or_else(|| AppError::not_found("There is no user with that email address."))?;

    let reset = new_reset_token();
    state
        .db
        .set_reset_token(&user.id, Some(&reset.hash), Some(reset.expires_at))
        .await?;

    // No mail transport: the link goes to the log for the operator.
    info!(
        "[API] Password reset for {}: {}/api/v1/users/resetPassword/{}",
        user.email, state.config.site_url, reset.token
    );
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "token sent to email.",
    })))
}

pub async fn reset_password(
    state: web::Data<AppState>,
    token: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .db
        .find_by_reset_token(&hash_reset_token(&token))
        .await?
        .ok_or_else(|| AppError::bad_request("Token is invalid or has expired"))?;

    let body = body.into_inner();
    validate_new_password(&body.password, &body.password_confirm)?;
    let hash = hash_password(body.password, state.config.bcrypt_cost).await?;
    state.db.set_password(&user.id, &hash).await?;

    info!("[API] Password reset completed for {}", user.id);
    send_token(&state, user, StatusCode::OK)
}

pub async fn update_my_password(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    body: web::Json<UpdatePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    change_password(&state, &user, body.into_inner()).await?;
    send_token(&state, user, StatusCode::OK)
}

pub async fn get_me(AuthUser(user): AuthUser) -> Result<HttpResponse, AppError> {
    respond(StatusCode::OK, "user", user)
}

pub async fn update_me(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    body: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
    let updated = update_profile(&state, &user, body.into_inner()).await?;
    respond(StatusCode::OK, "user", updated)
}

pub async fn delete_me(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    state.db.deactivate_user(&user.id).await?;
    Ok(no_content())
}

pub async fn list_users(
    state: web::Data<AppState>,
    AuthUser(admin): AuthUser,
) -> Result<HttpResponse, AppError> {
    require_role(&admin, &[Role::Admin])?;
    let users = state.db.list_users().await?;
    respond_list("users", users)
}

pub async fn get_user(
    state: web::Data<AppState>,
    AuthUser(admin): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&admin, &[Role::Admin])?;
    let user = state.db.get_user(&id).await?.ok_or_else(user_not_found)?;
    respond(StatusCode::OK, "user", user)
}

pub async fn update_user(
    state: web::Data<AppState>,
    AuthUser(admin): AuthUser,
    id: web::Path<String>,
    body: web::Json<AdminUserUpdate>,
) -> Result<HttpResponse, AppError> {
    require_role(&admin, &[Role::Admin])?;
    let mut update = body.into_inner();
    update.name = update.name.as_deref().map(validate_name).transpose()?;
    update.email = update.email.as_deref().map(normalize_email).transpose()?;

    let user = state.db.admin_update_user(&id, update).await?;
    info!("[API] Admin {} updated user {}", admin.id, user.id);
    respond(StatusCode::OK, "user", user)
}

pub async fn delete_user(
    state: web::Data<AppState>,
    AuthUser(admin): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&admin, &[Role::Admin])?;
    if !state.db.delete_user(&id).await? {
        return Err(user_not_found());
    }
    warn!("[API] Admin {} deleted user {id}", admin.id);
    Ok(no_content())
}

pub async fn set_role(
    state: web::Data<AppState>,
    AuthUser(admin): AuthUser,
    id: web::Path<String>,
    body: web::Json<RoleUpdate>,
) -> Result<HttpResponse, AppError> {
    require_role(&admin, &[Role::Admin])?;
    let user = state.db.set_role(&id, body.role).await?;
    respond(StatusCode::OK, "user", user)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/logout", web::get().to(logout))
            .route("/forgotPassword", web::post().to(forgot_password))
            .route("/resetPassword/{token}", web::patch().to(reset_password))
            .route("/updateMyPassword", web::patch().to(update_my_password))
            .route("/me", web::get().to(get_me))
            .route("/updateMe", web::patch().to(update_me))
            .route("/deleteMe", web::delete().to(delete_me))
            .configure(super::shortlists::configure)
            .route("", web::get().to(list_users))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::patch().to(update_user))
            .route("/{id}", web::delete().to(delete_user))
            .route("/{id}/role", web::patch().to(set_role)),
    );
}
