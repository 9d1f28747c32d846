use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub tour_id: String,
    pub user_id: String,
    pub review: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewAuthor {
    pub name: String,
    pub photo: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: Option<ReviewAuthor>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewReview {
    /// Tour id. Optional on the nested `/tours/{id}/reviews` route.
    #[serde(default)]
    pub tour: Option<String>,
    pub review: String,
    pub rating: f64,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReviewPatch {
    pub review: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ReviewFilter {
    pub tour: Option<String>,
}

pub fn validate_review(text: &str, rating: f64) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::bad_request("Review can not be empty"));
    }
    validate_rating(rating)
}

pub fn validate_rating(rating: f64) -> Result<(), AppError> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(AppError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

/// Average rounded to one decimal, or zero for an empty set.
pub fn average_rating(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let avg = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (avg * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_rounded_to_one_decimal() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5.0]), 5.0);
        assert_eq!(average_rating(&[4.0, 5.0, 5.0]), 4.7);
        assert_eq!(average_rating(&[1.0, 2.0]), 1.5);
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(0.5).is_err());
        assert!(validate_rating(5.1).is_err());
        assert!(validate_rating(f64::NAN).is_err());
        assert!(validate_review("   ", 4.0).is_err());
    }
}
