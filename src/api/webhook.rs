use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::json;

use crate::{
    error::AppError,
    payments::{verify_signature, CompletedSession, WebhookEvent},
    state::AppState,
};

const SIGNATURE_HEADER: &str = "Stripe-Signature";
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Receives Stripe events. The body is read raw because the signature
/// covers the exact bytes sent.
pub async fn checkout_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Missing signature"))?;
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal("Missing webhook secret".into()))?;

    verify_signature(&body, signature, secret, Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid webhook payload: {e}")))?;

    if event.kind == CHECKOUT_COMPLETED {
        let session: CompletedSession = serde_json::from_value(event.data.object)
            .map_err(|e| AppError::bad_request(format!("Invalid checkout session: {e}")))?;
        match settle_checkout(&state, &session).await {
            Ok(()) => {}
            // Redelivery cannot fix a session that names no known tour or
            // buyer, so acknowledge it instead of having Stripe retry.
            Err(AppError::NotFound(reason)) | Err(AppError::BadRequest(reason)) => {
                warn!("[STRIPE] Session {} not settled: {reason}", session.id);
            }
            Err(e) => return Err(e),
        }
    } else {
        debug!("[STRIPE] Ignoring event {}", event.kind);
    }

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

/// Marks the pending booking paid, or records a paid booking when the
/// session was opened elsewhere.
async fn settle_checkout(state: &AppState, session: &CompletedSession) -> Result<(), AppError> {
    if let Some(booking) = state.db.mark_paid(&session.id).await? {
        info!("[STRIPE] Session {} settled booking {}", session.id, booking.id);
        return remember_customer(state, session, &booking.user_id).await;
    }

    let tour_id = session
        .tour_id()
        .ok_or_else(|| AppError::bad_request("Checkout session has no tour reference"))?;

    let user_id = match session.user_id() {
        Some(id) => id.to_string(),
        None => {
            let email = session
                .email()
                .ok_or_else(|| AppError::bad_request("Checkout session has no customer"))?;
            state
                .db
                .get_user_by_email(&email.trim().to_lowercase())
                .await?
                .map(|(user, _)| user.id)
                .ok_or_else(|| AppError::not_found("No user found for this checkout"))?
        }
    };

    let price = match session.price() {
        Some(price) => price,
        None => state
            .db
            .get_tour(tour_id)
            .await?
            .map(|tour| tour.final_price())
            .ok_or_else(|| AppError::not_found("No tour found with that ID"))?,
    };

    let booking = state
        .db
        .create_paid_booking_from_session(&session.id, tour_id, &user_id, price)
        .await?;
    info!(
        "[STRIPE] Session {} recorded as booking {}",
        session.id, booking.id
    );
    remember_customer(state, session, &user_id).await
}

async fn remember_customer(
    state: &AppState,
    session: &CompletedSession,
    user_id: &str,
) -> Result<(), AppError> {
    if let Some(customer) = session.customer.as_deref() {
        state.db.set_stripe_customer_id(user_id, customer).await?;
        debug!("[STRIPE] Customer {customer} linked to user {user_id}");
    }
    Ok(())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/webhook-checkout", web::post().to(checkout_webhook))
        .route("/stripe/webhook", web::post().to(checkout_webhook));
}
