use actix_web::{web, HttpResponse};
use serde_json::json;

use super::{no_content, respond_list};
use crate::{auth::AuthUser, error::AppError, models::ShortlistKind, state::AppState};

pub async fn list(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    kind: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let kind: ShortlistKind = kind.parse()?;
    let entries = state.db.list_shortlist(&user.id, kind).await?;
    respond_list("entries", entries)
}

pub async fn add(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (kind, tour_id) = path.into_inner();
    let kind: ShortlistKind = kind.parse()?;
    state.db.add_to_shortlist(&user.id, kind, &tour_id).await?;
    let entries = state.db.list_shortlist(&user.id, kind).await?;
    respond_list("entries", entries)
}

pub async fn remove(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (kind, tour_id) = path.into_inner();
    let kind: ShortlistKind = kind.parse()?;
    state.db.remove_from_shortlist(&user.id, kind, &tour_id).await?;
    Ok(no_content())
}

pub async fn toggle(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (kind, tour_id) = path.into_inner();
    let kind: ShortlistKind = kind.parse()?;
    let member = state.db.toggle_shortlist(&user.id, kind, &tour_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "tourId": tour_id, "member": member },
    })))
}

pub async fn clear(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    kind: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let kind: ShortlistKind = kind.parse()?;
    state.db.clear_shortlist(&user.id, kind).await?;
    Ok(no_content())
}

/// Mounted inside the `/users` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/me/{kind}", web::get().to(list))
        .route("/me/{kind}", web::delete().to(clear))
        .route("/me/{kind}/{tour_id}", web::post().to(add))
        .route("/me/{kind}/{tour_id}", web::delete().to(remove))
        .route("/me/{kind}/{tour_id}/toggle", web::post().to(toggle));
}
