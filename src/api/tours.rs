use actix_web::{http::StatusCode, web, HttpResponse};
use log::info;

use super::{no_content, respond, respond_list};
use crate::{
    auth::{require_role, AuthUser},
    error::AppError,
    models::{
        tour::{recommend, NewTour, TourPatch, TourQuery, MAX_PAGE_SIZE},
        Role,
    },
    state::AppState,
};

const TOUR_EDITORS: &[Role] = &[Role::Admin, Role::LeadGuide];

pub async fn list_tours(
    state: web::Data<AppState>,
    query: web::Query<TourQuery>,
) -> Result<HttpResponse, AppError> {
    let tours = state.db.list_tours(&query).await?;
    respond_list("tours", tours)
}

pub async fn top_five_cheap(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let tours = state.db.list_tours(&TourQuery::top_five_cheap()).await?;
    respond_list("tours", tours)
}

pub async fn tour_stats(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = state.db.tour_stats().await?;
    respond(StatusCode::OK, "stats", stats)
}

pub async fn get_tour(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let tour = state
        .db
        .get_public_tour(&id)
        .await?
        .ok_or_else(|| AppError::not_found("No tour found with that ID"))?;
    respond(StatusCode::OK, "tour", tour)
}

pub async fn get_tour_by_slug(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let tour = state
        .db
        .get_tour_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("There is no tour with that name"))?;
    respond(StatusCode::OK, "tour", tour)
}

pub async fn recommendations(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let current = state
        .db
        .get_public_tour(&id)
        .await?
        .ok_or_else(|| AppError::not_found("No tour found with that ID"))?;

    let everything = TourQuery {
        sort: Some("createdAt".to_string()),
        limit: Some(MAX_PAGE_SIZE),
        ..TourQuery::default()
    };
    let candidates = state.db.list_tours(&everything).await?;
    respond_list("tours", recommend(&current, candidates))
}

pub async fn create_tour(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    body: web::Json<NewTour>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, TOUR_EDITORS)?;
    let tour = state.db.insert_tour(body.into_inner()).await?;
    info!("[API] {} created tour {}", user.id, tour.id);
    respond(StatusCode::CREATED, "tour", tour)
}

pub async fn update_tour(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
    body: web::Json<TourPatch>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, TOUR_EDITORS)?;
    let tour = state.db.update_tour(&id, body.into_inner()).await?;
    respond(StatusCode::OK, "tour", tour)
}

pub async fn delete_tour(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, TOUR_EDITORS)?;
    if !state.db.delete_tour(&id).await? {
        return Err(AppError::not_found("No tour found with that ID"));
    }
    info!("[API] {} deleted tour {id}", user.id);
    Ok(no_content())
}

pub async fn seed_tours(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    require_role(&user, &[Role::Admin])?;
    let report = state.db.seed_sample_tours().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": report,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tours")
            .route("", web::get().to(list_tours))
            .route("", web::post().to(create_tour))
            .route("/top-5-cheap", web::get().to(top_five_cheap))
            .route("/tour-stats", web::get().to(tour_stats))
            .route("/seed", web::post().to(seed_tours))
            .route("/slug/{slug}", web::get().to(get_tour_by_slug))
            .route(
                "/{tour_id}/reviews",
                web::get().to(super::reviews::list_tour_reviews),
            )
            .route(
                "/{tour_id}/reviews",
                web::post().to(super::reviews::create_tour_review),
            )
            .route("/{id}/recommendations", web::get().to(recommendations))
            .route("/{id}", web::get().to(get_tour))
            .route("/{id}", web::patch().to(update_tour))
            .route("/{id}", web::delete().to(delete_tour)),
    );
}
