//! HTTP handlers for `/api/v1` and the payment webhook.

use actix_web::{http::StatusCode, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::{json, Map};

use crate::error::AppError;

pub mod bookings;
pub mod reviews;
pub mod shortlists;
pub mod tours;
pub mod users;
pub mod webhook;

/// `{"status": "success", "data": {<key>: <value>}}`
pub(crate) fn respond<T: Serialize>(
    status: StatusCode,
    key: &str,
    value: T,
) -> Result<HttpResponse, AppError> {
    let mut data = Map::new();
    data.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(HttpResponse::build(status).json(json!({ "status": "success", "data": data })))
}

/// Like [`respond`], with a `results` count next to the data.
pub(crate) fn respond_list<T: Serialize>(key: &str, items: Vec<T>) -> Result<HttpResponse, AppError> {
    let results = items.len();
    let mut data = Map::new();
    data.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": results,
        "data": data,
    })))
}

pub(crate) fn no_content() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(AppError::not_found(format!(
        "Can't find {} on this server.",
        req.path()
    )))
}
