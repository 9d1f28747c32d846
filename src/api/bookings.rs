use actix_web::{http::StatusCode, web, HttpResponse};
use log::info;
use serde_json::json;

use super::{no_content, respond, respond_list};
use crate::{
    auth::{require_role, AuthUser},
    error::AppError,
    models::{
        booking::{BookingPatch, NewBooking},
        Role, Tour, User,
    },
    payments::{CheckoutRequest, CheckoutSession},
    state::AppState,
};

const BOOKING_STAFF: &[Role] = &[Role::Admin, Role::LeadGuide];

fn booking_not_found() -> AppError {
    AppError::not_found("No booking found with that ID")
}

/// Opens a hosted checkout for the tour and records the booking as pending
/// until the webhook confirms payment.
pub(crate) async fn start_checkout(
    state: &AppState,
    user: &User,
    tour: &Tour,
) -> Result<CheckoutSession, AppError> {
    let gateway = state.gateway()?;
    let request = CheckoutRequest::for_tour(tour, &user.id, &user.email, &state.config.site_url);
    let session = gateway.create_checkout_session(&request).await?;

    state
        .db
        .create_pending_booking(&tour.id, &user.id, tour.final_price(), &session.id)
        .await?;
    info!("[API] Checkout {} started by {} for {}", session.id, user.id, tour.id);
    Ok(session)
}

pub async fn checkout_session(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    tour_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let tour = state
        .db
        .get_public_tour(&tour_id)
        .await?
        .ok_or_else(|| AppError::not_found("No tour found with that ID"))?;
    let session = start_checkout(&state, &user, &tour).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "session": { "id": session.id, "url": session.url },
    })))
}

pub async fn my_bookings(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    let bookings = state.db.list_bookings_for_user(&user.id).await?;
    respond_list("bookings", bookings)
}

pub async fn my_tours(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    let tours = state.db.booked_tours_for_user(&user.id).await?;
    respond_list("tours", tours)
}

pub async fn list_bookings(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    require_role(&user, BOOKING_STAFF)?;
    let bookings = state.db.list_bookings().await?;
    respond_list("bookings", bookings)
}

pub async fn create_booking(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    body: web::Json<NewBooking>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, BOOKING_STAFF)?;
    let booking = state.db.create_booking(body.into_inner()).await?;
    respond(StatusCode::CREATED, "booking", booking)
}

pub async fn get_booking(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, BOOKING_STAFF)?;
    let booking = state.db.get_booking(&id).await?.ok_or_else(booking_not_found)?;
    respond(StatusCode::OK, "booking", booking)
}

pub async fn update_booking(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
    body: web::Json<BookingPatch>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, BOOKING_STAFF)?;
    let booking = state.db.update_booking(&id, body.into_inner()).await?;
    respond(StatusCode::OK, "booking", booking)
}

pub async fn delete_booking(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_role(&user, BOOKING_STAFF)?;
    if !state.db.delete_booking(&id).await? {
        return Err(booking_not_found());
    }
    Ok(no_content())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("/checkout-session/{tour_id}", web::get().to(checkout_session))
            .route("/my-bookings", web::get().to(my_bookings))
            .route("/my-tours", web::get().to(my_tours))
            .route("", web::get().to(list_bookings))
            .route("", web::post().to(create_booking))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}", web::patch().to(update_booking))
            .route("/{id}", web::delete().to(delete_booking)),
    );
}
