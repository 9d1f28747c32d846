use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            _ => Err(AppError::bad_request(
                "Difficulty is either: easy, medium, difficult",
            )),
        }
    }
}

/// A GeoJSON point. Coordinates are `[longitude, latitude]`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub duration: u32,
    pub max_group_size: u32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: String,
    pub image_cover: Option<String>,
    pub images: Vec<String>,
    pub start_dates: Vec<String>,
    pub secret_tour: bool,
    pub start_location: Option<Location>,
    pub locations: Vec<Location>,
    pub guides: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tour {
    /// Price the customer pays at checkout.
    pub fn final_price(&self) -> f64 {
        match self.price_discount {
            Some(discount) if discount > 0.0 => self.price - discount,
            _ => self.price,
        }
    }
}

/// Client input for creating a tour. Ratings are derived from reviews and
/// therefore not accepted here.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTour {
    pub name: String,
    pub duration: u32,
    pub max_group_size: u32,
    pub difficulty: Difficulty,
    pub price: f64,
    #[serde(default)]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<String>,
    #[serde(default)]
    pub secret_tour: bool,
    #[serde(default)]
    pub start_location: Option<Location>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub guides: Vec<String>,
}

impl NewTour {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_positive("duration", self.duration)?;
        validate_positive("maxGroupSize", self.max_group_size)?;
        validate_price(self.price, self.price_discount)?;
        if self.summary.trim().is_empty() {
            return Err(AppError::bad_request("A tour must have a summary"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TourPatch {
    pub name: Option<String>,
    pub duration: Option<u32>,
    pub max_group_size: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<f64>,
    pub price_discount: Option<f64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub start_dates: Option<Vec<String>>,
    pub secret_tour: Option<bool>,
    pub start_location: Option<Location>,
    pub locations: Option<Vec<Location>>,
    pub guides: Option<Vec<String>>,
}

impl TourPatch {
    /// Apply the patch onto `tour` and validate the merged result.
    pub fn apply(self, tour: &mut Tour) -> Result<(), AppError> {
        if let Some(name) = self.name {
            validate_name(&name)?;
            tour.slug = slugify(&name);
            tour.name = name;
        }
        if let Some(duration) = self.duration {
            validate_positive("duration", duration)?;
            tour.duration = duration;
        }
        if let Some(size) = self.max_group_size {
            validate_positive("maxGroupSize", size)?;
            tour.max_group_size = size;
        }
        if let Some(difficulty) = self.difficulty {
            tour.difficulty = difficulty;
        }
        if let Some(price) = self.price {
            tour.price = price;
        }
        if self.price_discount.is_some() {
            tour.price_discount = self.price_discount;
        }
        validate_price(tour.price, tour.price_discount)?;
        if let Some(summary) = self.summary {
            if summary.trim().is_empty() {
                return Err(AppError::bad_request("A tour must have a summary"));
            }
            tour.summary = summary;
        }
        if let Some(description) = self.description {
            tour.description = description;
        }
        if self.image_cover.is_some() {
            tour.image_cover = self.image_cover;
        }
        if let Some(images) = self.images {
            tour.images = images;
        }
        if let Some(dates) = self.start_dates {
            tour.start_dates = dates;
        }
        if let Some(secret) = self.secret_tour {
            tour.secret_tour = secret;
        }
        if self.start_location.is_some() {
            tour.start_location = self.start_location;
        }
        if let Some(locations) = self.locations {
            tour.locations = locations;
        }
        if let Some(guides) = self.guides {
            tour.guides = guides;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if !(10..=40).contains(&len) {
        return Err(AppError::bad_request(
            "A tour name must have between 10 and 40 characters",
        ));
    }
    Ok(())
}

fn validate_positive(field: &str, value: u32) -> Result<(), AppError> {
    if value == 0 {
        return Err(AppError::bad_request(format!("{field} must be above 0")));
    }
    Ok(())
}

fn validate_price(price: f64, discount: Option<f64>) -> Result<(), AppError> {
    if price.is_nan() || price <= 0.0 {
        return Err(AppError::bad_request("A tour must have a positive price"));
    }
    if let Some(discount) = discount {
        if discount < 0.0 || discount >= price {
            return Err(AppError::bad_request(format!(
                "Discount price ({discount}) should be below regular price"
            )));
        }
    }
    Ok(())
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Listing parameters for `GET /tours`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TourQuery {
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub price_gte: Option<f64>,
    pub price_lte: Option<f64>,
    pub duration_gte: Option<u32>,
    pub duration_lte: Option<u32>,
    pub ratings_gte: Option<f64>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl TourQuery {
    pub fn top_five_cheap() -> Self {
        Self {
            sort: Some("-ratingsAverage,price".to_string()),
            limit: Some(5),
            ..Self::default()
        }
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Translate the `sort` parameter into an SQL ORDER BY list. Unknown
    /// fields are rejected rather than ignored.
    pub fn order_by(&self) -> Result<String, AppError> {
        let sort = self.sort.as_deref().unwrap_or("-createdAt");
        let mut clauses = Vec::new();
        for field in sort.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let (name, direction) = match field.strip_prefix('-') {
                Some(name) => (name, "DESC"),
                None => (field, "ASC"),
            };
            let column = match name {
                "price" => "price",
                "duration" => "duration",
                "ratingsAverage" => "ratings_average",
                "ratingsQuantity" => "ratings_quantity",
                "createdAt" => "created_at",
                "name" => "name",
                other => {
                    return Err(AppError::bad_request(format!(
                        "Cannot sort tours by '{other}'"
                    )))
                }
            };
            clauses.push(format!("{column} {direction}"));
        }
        if clauses.is_empty() {
            clauses.push("created_at DESC".to_string());
        }
        clauses.push("rowid ASC".to_string());
        Ok(clauses.join(", "))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: Difficulty,
    pub num_tours: u32,
    pub num_ratings: u32,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

const MAX_RECOMMENDATIONS: usize = 4;

/// Rank `candidates` by similarity to `current`, best first, at most four.
///
/// Same difficulty scores 3, a price within 20% scores 2, a duration within
/// two days scores 2 and a rating of at least 4.5 scores 1. Ties keep the
/// candidates' original order.
pub fn recommend(current: &Tour, candidates: Vec<Tour>) -> Vec<Tour> {
    let mut scored: Vec<(u32, Tour)> = candidates
        .into_iter()
        .filter(|tour| tour.id != current.id)
        .map(|tour| {
            let mut score = 0;
            if tour.difficulty == current.difficulty {
                score += 3;
            }
            if current.price > 0.0 && (tour.price - current.price).abs() / current.price <= 0.2 {
                score += 2;
            }
            if tour.duration.abs_diff(current.duration) <= 2 {
                score += 2;
            }
            if tour.ratings_average >= 4.5 {
                score += 1;
            }
            (score, tour)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(_, tour)| tour)
        .collect()
}
