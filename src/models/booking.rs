use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tour::Tour;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub tour_id: String,
    pub user_id: String,
    pub price: f64,
    pub paid: bool,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BookingWithTour {
    #[serde(flatten)]
    pub booking: Booking,
    pub tour: Option<Tour>,
}

/// Manual booking by staff, e.g. for cash payments.
#[derive(Deserialize, Debug, Clone)]
pub struct NewBooking {
    pub tour: String,
    pub user: String,
    pub price: f64,
    #[serde(default = "paid_by_default")]
    pub paid: bool,
}

fn paid_by_default() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct BookingPatch {
    pub price: Option<f64>,
    pub paid: Option<bool>,
}
