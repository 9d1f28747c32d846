//! Data loaders for the rendered pages. During server rendering they run in
//! process; the same functions answer under `/api/views` for a browser.

use actix_web::{http::StatusCode, web};
use leptos::*;
use leptos_actix::{extract, ResponseOptions};
use log::error;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{
        tour::{TourQuery, MAX_PAGE_SIZE},
        ReviewWithAuthor, Tour, User,
    },
    state::AppState,
};

pub const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";
pub const NO_SUCH_TOUR: &str = "There is no tour with that name";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TourDetails {
    pub tour: Tour,
    pub guides: Vec<User>,
    pub reviews: Vec<ReviewWithAuthor>,
}

/// Operational messages go to the page as-is; anything else is logged and
/// replaced with a generic message.
fn page_error(e: AppError) -> ServerFnError {
    if e.is_operational() {
        ServerFnError::ServerError(e.to_string())
    } else {
        error!("[VIEW] {e}");
        ServerFnError::ServerError("Something went very wrong".into())
    }
}

fn set_status(status: StatusCode) {
    if let Some(response) = use_context::<ResponseOptions>() {
        response.set_status(status);
    }
}

async fn app_state() -> Result<web::Data<AppState>, ServerFnError> {
    extract::<web::Data<AppState>>().await
}

/// The visitor behind the `jwt` cookie, if any. A missing, expired or stale
/// token simply means nobody is logged in.
#[server(CurrentUser, "/api/views")]
pub async fn current_user() -> Result<Option<User>, ServerFnError> {
    let user = extract::<Option<AuthUser>>().await?;
    Ok(user.map(|AuthUser(user)| user))
}

#[server(ListTours, "/api/views")]
pub async fn list_tours() -> Result<Vec<Tour>, ServerFnError> {
    let state = app_state().await?;
    let query = TourQuery {
        limit: Some(MAX_PAGE_SIZE),
        ..TourQuery::default()
    };
    state.db.list_tours(&query).await.map_err(page_error)
}

/// A public tour with its guides and reviews. Unknown and secret slugs set
/// a 404 on the page response.
#[server(GetTourDetails, "/api/views")]
pub async fn get_tour_details(slug: String) -> Result<TourDetails, ServerFnError> {
    let state = app_state().await?;
    let Some(tour) = state.db.get_tour_by_slug(&slug).await.map_err(page_error)? else {
        set_status(StatusCode::NOT_FOUND);
        return Err(ServerFnError::ServerError(NO_SUCH_TOUR.into()));
    };

    let mut guides = Vec::with_capacity(tour.guides.len());
    for id in &tour.guides {
        if let Some(guide) = state.db.get_user(id).await.map_err(page_error)? {
            guides.push(guide);
        }
    }
    let reviews = state
        .db
        .list_reviews(Some(&tour.id))
        .await
        .map_err(page_error)?;

    Ok(TourDetails {
        tour,
        guides,
        reviews,
    })
}

/// Tours the logged-in visitor holds a booking for.
#[server(ListBookedTours, "/api/views")]
pub async fn list_booked_tours() -> Result<Vec<Tour>, ServerFnError> {
    let state = app_state().await?;
    let Some(AuthUser(user)) = extract::<Option<AuthUser>>().await? else {
        set_status(StatusCode::UNAUTHORIZED);
        return Err(ServerFnError::ServerError(NOT_LOGGED_IN.into()));
    };
    state
        .db
        .booked_tours_for_user(&user.id)
        .await
        .map_err(page_error)
}
