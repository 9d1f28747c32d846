//! Plain HTML form posts from the rendered pages. Every outcome is a 303
//! back to a page; failures ride along in an `error` query parameter.

use actix_web::{cookie::Cookie, http::header, web, HttpResponse};
use log::{error, info};

use crate::{
    api::{
        bookings::start_checkout,
        users::{authenticate, change_password, new_session, register, update_profile},
    },
    auth::{logout_cookie, AuthUser},
    error::AppError,
    models::user::{LoginRequest, ProfileUpdate, SignupRequest, UpdatePasswordRequest},
    server_fns::NO_SUCH_TOUR,
    state::AppState,
};

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn see_other_with(location: &str, cookie: Cookie<'static>) -> HttpResponse {
    HttpResponse::SeeOther()
        .cookie(cookie)
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Redirect to `page` with the failure shown in its alert banner.
fn back_with_error(page: &str, e: AppError) -> HttpResponse {
    let message = if e.is_operational() {
        e.to_string()
    } else {
        error!("[FORM] {e}");
        "Something went very wrong".to_string()
    };
    see_other(&format!("{page}?error={}", urlencoding::encode(&message)))
}

pub async fn login(state: web::Data<AppState>, form: web::Form<LoginRequest>) -> HttpResponse {
    let session = authenticate(&state, form.into_inner())
        .await
        .and_then(|user| new_session(&state, &user.id));
    match session {
        Ok((_, cookie)) => see_other_with("/", cookie),
        Err(e) => back_with_error("/login", e),
    }
}

pub async fn signup(state: web::Data<AppState>, form: web::Form<SignupRequest>) -> HttpResponse {
    let session = register(&state, form.into_inner())
        .await
        .and_then(|user| new_session(&state, &user.id));
    match session {
        Ok((_, cookie)) => see_other_with("/", cookie),
        Err(e) => back_with_error("/signup", e),
    }
}

pub async fn logout() -> HttpResponse {
    see_other_with("/", logout_cookie())
}

pub async fn submit_user_data(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    form: web::Form<ProfileUpdate>,
) -> HttpResponse {
    let Some(AuthUser(user)) = user else {
        return see_other("/login");
    };
    match update_profile(&state, &user, form.into_inner()).await {
        Ok(_) => see_other("/me?alert=saved"),
        Err(e) => back_with_error("/me", e),
    }
}

/// Changing the password retires older tokens, so the browser gets a fresh
/// one along with the redirect.
pub async fn submit_password(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    form: web::Form<UpdatePasswordRequest>,
) -> HttpResponse {
    let Some(AuthUser(user)) = user else {
        return see_other("/login");
    };
    let session = change_password(&state, &user, form.into_inner())
        .await
        .and_then(|()| new_session(&state, &user.id));
    match session {
        Ok((_, cookie)) => see_other_with("/me?alert=password", cookie),
        Err(e) => back_with_error("/me", e),
    }
}

/// Sends the buyer off to the hosted checkout for the tour.
pub async fn book_tour(
    state: web::Data<AppState>,
    user: Option<AuthUser>,
    slug: web::Path<String>,
) -> HttpResponse {
    let Some(AuthUser(user)) = user else {
        return see_other("/login");
    };
    let tour_page = format!("/tour/{slug}");

    let tour = match state.db.get_tour_by_slug(&slug).await {
        Ok(Some(tour)) => tour,
        Ok(None) => return back_with_error(&tour_page, AppError::not_found(NO_SUCH_TOUR)),
        Err(e) => return back_with_error(&tour_page, e),
    };
    match start_checkout(&state, &user, &tour).await {
        Ok(session) => {
            info!("[FORM] Redirecting {} to checkout {}", user.id, session.id);
            see_other(session.url.as_deref().unwrap_or("/my-tours"))
        }
        Err(e) => back_with_error(&tour_page, e),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    )
    .route("/login", web::post().to(login))
    .route("/signup", web::post().to(signup))
    .route("/logout", web::post().to(logout))
    .route("/submit-user-data", web::post().to(submit_user_data))
    .route("/submit-password", web::post().to(submit_password))
    .route("/tour/{slug}/book", web::post().to(book_tour));
}
