use actix_web::{http::StatusCode, web, HttpResponse};
use log::info;

use super::{no_content, respond, respond_list};
use crate::{
    auth::{require_role, AuthUser},
    error::AppError,
    models::{
        review::{NewReview, ReviewFilter, ReviewPatch},
        Review, Role, User,
    },
    state::AppState,
};

fn not_owned() -> AppError {
    AppError::not_found("Review not found or unauthorized")
}

/// Authors may change their own reviews; admins may change any.
async fn owned_review(state: &AppState, user: &User, id: &str) -> Result<Review, AppError> {
    let review = state.db.get_review(id).await?.ok_or_else(not_owned)?;
    if review.user_id != user.id && user.role != Role::Admin {
        return Err(not_owned());
    }
    Ok(review)
}

async fn create(
    state: &AppState,
    user: &User,
    tour_id: &str,
    body: NewReview,
) -> Result<HttpResponse, AppError> {
    require_role(user, &[Role::User])?;
    let review = state
        .db
        .insert_review(tour_id, &user.id, &body.review, body.rating)
        .await?;
    info!("[API] Review {} posted on tour {tour_id}", review.id);
    respond(StatusCode::CREATED, "review", review)
}

pub async fn list_reviews(
    state: web::Data<AppState>,
    _user: AuthUser,
    filter: web::Query<ReviewFilter>,
) -> Result<HttpResponse, AppError> {
    let reviews = state.db.list_reviews(filter.tour.as_deref()).await?;
    respond_list("reviews", reviews)
}

pub async fn list_tour_reviews(
    state: web::Data<AppState>,
    _user: AuthUser,
    tour_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let reviews = state.db.list_reviews(Some(tour_id.as_str())).await?;
    respond_list("reviews", reviews)
}

pub async fn create_review(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    body: web::Json<NewReview>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let tour_id = body
        .tour
        .clone()
        .ok_or_else(|| AppError::bad_request("Review must belong to a tour"))?;
    create(&state, &user, &tour_id, body).await
}

pub async fn create_tour_review(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    tour_id: web::Path<String>,
    body: web::Json<NewReview>,
) -> Result<HttpResponse, AppError> {
    create(&state, &user, &tour_id, body.into_inner()).await
}

pub async fn get_review(
    state: web::Data<AppState>,
    _user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let review = state
        .db
        .get_review(&id)
        .await?
        .ok_or_else(|| AppError::not_found("No review found with that ID"))?;
    respond(StatusCode::OK, "review", review)
}

pub async fn update_review(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
    body: web::Json<ReviewPatch>,
) -> Result<HttpResponse, AppError> {
    owned_review(&state, &user, &id).await?;
    let review = state.db.update_review(&id, body.into_inner()).await?;
    respond(StatusCode::OK, "review", review)
}

pub async fn delete_review(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    owned_review(&state, &user, &id).await?;
    state.db.delete_review(&id).await?;
    info!("[API] Review {id} deleted by {}", user.id);
    Ok(no_content())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reviews")
            .route("", web::get().to(list_reviews))
            .route("", web::post().to(create_review))
            .route("/{id}", web::get().to(get_review))
            .route("/{id}", web::patch().to(update_review))
            .route("/{id}", web::delete().to(delete_review)),
    );
}
