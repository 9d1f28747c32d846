//! Stripe hosted checkout and webhook signature checks.

use std::collections::HashMap;

use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::{error::AppError, models::Tour};

type HmacSha256 = Hmac<Sha256>;

/// Signed webhook timestamps older or newer than this are refused.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub tour_id: String,
    pub tour_name: String,
    pub tour_summary: String,
    pub image_url: Option<String>,
    /// Smallest currency unit (cents).
    pub unit_amount: i64,
    pub customer_email: String,
    pub user_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    pub fn for_tour(tour: &Tour, user_id: &str, email: &str, site_url: &str) -> Self {
        Self {
            tour_id: tour.id.clone(),
            tour_name: format!("{} Tour", tour.name),
            tour_summary: tour.summary.clone(),
            image_url: tour
                .image_cover
                .as_ref()
                .map(|cover| format!("{site_url}{cover}")),
            unit_amount: (tour.final_price() * 100.0).round() as i64,
            customer_email: email.to_string(),
            user_id: user_id.to_string(),
            success_url: format!("{site_url}/my-tours?alert=booking"),
            cancel_url: format!("{site_url}/tour/{}", tour.slug),
        }
    }

    fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("client_reference_id".to_string(), self.tour_id.clone()),
            ("metadata[tourId]".to_string(), self.tour_id.clone()),
            ("metadata[userId]".to_string(), self.user_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                "usd".to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                self.unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                self.tour_name.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]".to_string(),
                self.tour_summary.clone(),
            ),
        ];
        if let Some(image) = &self.image_url {
            fields.push((
                "line_items[0][price_data][product_data][images][0]".to_string(),
                image.clone(),
            ));
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

pub trait PaymentGateway: Send + Sync {
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, AppError>>;
}

pub struct StripeGateway {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl PaymentGateway for StripeGateway {
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a CheckoutRequest,
    ) -> BoxFuture<'a, Result<CheckoutSession, AppError>> {
        Box::pin(async move {
            let res = self
                .client
                .post(format!("{}/v1/checkout/sessions", self.api_base))
                .bearer_auth(&self.secret_key)
                .form(&request.form_fields())
                .send()
                .await?;

            let status = res.status();
            let body = res.text().await?;
            if !status.is_success() {
                let message = serde_json::from_str::<StripeErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.error.message)
                    .unwrap_or(body);
                warn!("[STRIPE] Checkout session rejected ({status}): {message}");
                return Err(AppError::Payment(message));
            }

            let session: CheckoutSession = serde_json::from_str(&body)?;
            info!(
                "[STRIPE] Checkout session {} opened for tour {}",
                session.id, request.tour_id
            );
            Ok(session)
        })
    }
}

fn signature_failed() -> AppError {
    AppError::bad_request("Webhook signature verification failed")
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(signature_failed)?;
    if signatures.is_empty() || (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(signature_failed());
    }

    let mac = signed_mac(payload, secret, timestamp)?;
    let valid = signatures.iter().any(|candidate| match hex::decode(candidate) {
        Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
        Err(_) => false,
    });
    if valid {
        Ok(())
    } else {
        Err(signature_failed())
    }
}

/// Header value a sender holding `secret` would attach to `payload`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
    let mac = signed_mac(payload, secret, timestamp)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> Result<HmacSha256, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("webhook key: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

/// The fields of a completed checkout session used to settle a booking.
#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    pub client_reference_id: Option<String>,
    /// Stripe customer id, present once Stripe has created a customer.
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CompletedSession {
    pub fn tour_id(&self) -> Option<&str> {
        self.client_reference_id
            .as_deref()
            .or_else(|| self.metadata.get("tourId").map(String::as_str))
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("userId").map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.customer_email.as_deref().or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|details| details.email.as_deref())
        })
    }

    /// Amount paid in currency units.
    pub fn price(&self) -> Option<f64> {
        self.amount_total.map(|cents| cents as f64 / 100.0)
    }
}
