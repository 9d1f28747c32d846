use log::{debug, info};
use rusqlite::{params, params_from_iter, types::ToSql, Connection, OptionalExtension, Row};

use super::{
    enum_column, json_column, new_id, now, optional_json_column,
    timestamp, unique_violation_column, Database,
};
use crate::{
    error::AppError,
    models::{
        review::average_rating,
        tour::{slugify, DifficultyStats, NewTour, TourPatch, TourQuery},
        Tour,
    },
};

pub(super) const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
     ratings_average, ratings_quantity, price, price_discount, summary, description, \
     image_cover, images, start_dates, secret_tour, start_location, locations, guides, \
     created_at, updated_at";

pub(super) fn tour_from_row(row: &Row<'_>) -> rusqlite::Result<Tour> {
    Ok(Tour {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        duration: row.get(3)?,
        max_group_size: row.get(4)?,
        difficulty: enum_column(row, 5)?,
        ratings_average: row.get(6)?,
        ratings_quantity: row.get(7)?,
        price: row.get(8)?,
        price_discount: row.get(9)?,
        summary: row.get(10)?,
        description: row.get(11)?,
        image_cover: row.get(12)?,
        images: json_column(row, 13)?,
        start_dates: json_column(row, 14)?,
        secret_tour: row.get(15)?,
        start_location: optional_json_column(row, 16)?,
        locations: json_column(row, 17)?,
        guides: json_column(row, 18)?,
        created_at: timestamp(row, 19)?,
        updated_at: timestamp(row, 20)?,
    })
}

pub(super) fn query_tour(conn: &Connection, id: &str) -> rusqlite::Result<Option<Tour>> {
    conn.query_row(
        &format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = ?"),
        [id],
        tour_from_row,
    )
    .optional()
}

pub(super) fn tour_not_found() -> AppError {
    AppError::not_found("No tour found with that ID")
}

/// Recompute the cached rating aggregate of a tour from its reviews.
pub(super) fn refresh_tour_ratings(conn: &Connection, tour_id: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("SELECT rating FROM reviews WHERE tour_id = ?")?;
    let ratings: Vec<f64> = stmt
        .query_map([tour_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    conn.execute(
        "UPDATE tours SET ratings_average = ?, ratings_quantity = ? WHERE id = ?",
        params![average_rating(&ratings), ratings.len() as i64, tour_id],
    )?;
    debug!(
        "[DB] Tour {tour_id} ratings refreshed: {} reviews",
        ratings.len()
    );
    Ok(())
}

pub(super) fn write_tour(conn: &Connection, tour: &Tour, insert: bool) -> Result<(), AppError> {
    let sql = if insert {
        "INSERT INTO tours (name, slug, duration, max_group_size, difficulty, ratings_average,
            ratings_quantity, price, price_discount, summary, description, image_cover, images,
            start_dates, secret_tour, start_location, locations, guides, created_at, updated_at, id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    } else {
        "UPDATE tours SET name = ?, slug = ?, duration = ?, max_group_size = ?, difficulty = ?,
            ratings_average = ?, ratings_quantity = ?, price = ?, price_discount = ?, summary = ?,
            description = ?, image_cover = ?, images = ?, start_dates = ?, secret_tour = ?,
            start_location = ?, locations = ?, guides = ?, created_at = ?, updated_at = ?
         WHERE id = ?"
    };

    let start_location = tour
        .start_location
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        sql,
        params![
            tour.name,
            tour.slug,
            tour.duration,
            tour.max_group_size,
            tour.difficulty.as_str(),
            tour.ratings_average,
            tour.ratings_quantity,
            tour.price,
            tour.price_discount,
            tour.summary,
            tour.description,
            tour.image_cover,
            serde_json::to_string(&tour.images)?,
            serde_json::to_string(&tour.start_dates)?,
            tour.secret_tour,
            start_location,
            serde_json::to_string(&tour.locations)?,
            serde_json::to_string(&tour.guides)?,
            tour.created_at.timestamp_millis(),
            tour.updated_at.timestamp_millis(),
            tour.id,
        ],
    )
    .map_err(|e| {
        let conflict = unique_violation_column(&e).map(|column| match column {
            "slug" => AppError::Conflict(format!("slug: \"{}\"", tour.slug)),
            _ => AppError::Conflict(format!("name: \"{}\"", tour.name)),
        });
        conflict.unwrap_or_else(|| e.into())
    })?;
    Ok(())
}

impl Database {
    pub async fn insert_tour(&self, new_tour: NewTour) -> Result<Tour, AppError> {
        new_tour.validate()?;

        let now = now();
        let tour = Tour {
            id: new_id(),
            slug: slugify(&new_tour.name),
            name: new_tour.name.trim().to_string(),
            duration: new_tour.duration,
            max_group_size: new_tour.max_group_size,
            difficulty: new_tour.difficulty,
            ratings_average: 0.0,
            ratings_quantity: 0,
            price: new_tour.price,
            price_discount: new_tour.price_discount,
            summary: new_tour.summary.trim().to_string(),
            description: new_tour.description.trim().to_string(),
            image_cover: new_tour.image_cover,
            images: new_tour.images,
            start_dates: new_tour.start_dates,
            secret_tour: new_tour.secret_tour,
            start_location: new_tour.start_location,
            locations: new_tour.locations,
            guides: new_tour.guides,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock().await;
        write_tour(&conn, &tour, true)?;
        info!("[DB] Tour created: {} ({})", tour.name, tour.id);
        Ok(tour)
    }

    pub async fn get_tour(&self, id: &str) -> Result<Option<Tour>, AppError> {
        let conn = self.conn.lock().await;
        Ok(query_tour(&conn, id)?)
    }

    /// Like [`Database::get_tour`] but secret tours read as missing.
    pub async fn get_public_tour(&self, id: &str) -> Result<Option<Tour>, AppError> {
        let conn = self.conn.lock().await;
        let tour = conn
            .query_row(
                &format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = ? AND secret_tour = 0"),
                [id],
                tour_from_row,
            )
            .optional()?;
        Ok(tour)
    }

    /// Secret tours are not reachable by slug.
    pub async fn get_tour_by_slug(&self, slug: &str) -> Result<Option<Tour>, AppError> {
        let conn = self.conn.lock().await;
        let tour = conn
            .query_row(
                &format!("SELECT {TOUR_COLUMNS} FROM tours WHERE slug = ? AND secret_tour = 0"),
                [slug],
                tour_from_row,
            )
            .optional()?;
        Ok(tour)
    }

    /// Public listing. Secret tours never appear here.
    pub async fn list_tours(&self, query: &TourQuery) -> Result<Vec<Tour>, AppError> {
        let order_by = query.order_by()?;

        let mut clauses = vec!["secret_tour = 0".to_string()];
        let mut values: Vec<Box<dyn ToSql + Send>> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            clauses.push(
                "(instr(lower(name), ?) > 0 OR instr(lower(summary), ?) > 0 \
                 OR instr(lower(description), ?) > 0)"
                    .to_string(),
            );
            for _ in 0..3 {
                values.push(Box::new(needle.clone()));
            }
        }
        if let Some(difficulty) = query.difficulty {
            clauses.push("difficulty = ?".to_string());
            values.push(Box::new(difficulty.as_str()));
        }
        if let Some(min) = query.price_gte {
            clauses.push("price >= ?".to_string());
            values.push(Box::new(min));
        }
        if let Some(max) = query.price_lte {
            clauses.push("price <= ?".to_string());
            values.push(Box::new(max));
        }
        if let Some(min) = query.duration_gte {
            clauses.push("duration >= ?".to_string());
            values.push(Box::new(min));
        }
        if let Some(max) = query.duration_lte {
            clauses.push("duration <= ?".to_string());
            values.push(Box::new(max));
        }
        if let Some(min) = query.ratings_gte {
            clauses.push("ratings_average >= ?".to_string());
            values.push(Box::new(min));
        }

        let limit = query.limit();
        let offset = i64::from(query.page() - 1).saturating_mul(i64::from(limit));
        values.push(Box::new(limit));
        values.push(Box::new(offset));

        let sql = format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE {} ORDER BY {order_by} LIMIT ? OFFSET ?",
            clauses.join(" AND ")
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let tours = stmt
            .query_map(params_from_iter(values.iter()), tour_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("[DB] Listed {} tours", tours.len());
        Ok(tours)
    }

    pub async fn update_tour(&self, id: &str, patch: TourPatch) -> Result<Tour, AppError> {
        let conn = self.conn.lock().await;
        let mut tour = query_tour(&conn, id)?.ok_or_else(tour_not_found)?;

        patch.apply(&mut tour)?;
        tour.updated_at = now();
        write_tour(&conn, &tour, false)?;
        info!("[DB] Tour updated: {}", tour.id);
        Ok(tour)
    }

    /// Deletes the tour together with its reviews, bookings and list entries.
    pub async fn delete_tour(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM tours WHERE id = ?", [id])?;
        if deleted > 0 {
            info!("[DB] Tour deleted: {id}");
        }
        Ok(deleted > 0)
    }

    pub async fn tour_stats(&self) -> Result<Vec<DifficultyStats>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT difficulty,
                    COUNT(*),
                    COALESCE(SUM(ratings_quantity), 0),
                    AVG(ratings_average),
                    AVG(price),
                    MIN(price),
                    MAX(price)
             FROM tours
             WHERE secret_tour = 0
             GROUP BY difficulty
             ORDER BY AVG(price) ASC",
        )?;

        let stats = stmt
            .query_map([], |row| {
                let avg_rating: f64 = row.get(3)?;
                let avg_price: f64 = row.get(4)?;
                Ok(DifficultyStats {
                    difficulty: enum_column(row, 0)?,
                    num_tours: row.get(1)?,
                    num_ratings: row.get(2)?,
                    avg_rating: (avg_rating * 10.0).round() / 10.0,
                    avg_price: (avg_price * 100.0).round() / 100.0,
                    min_price: row.get(5)?,
                    max_price: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::{
        error::AppError,
        models::{
            tour::{TourPatch, TourQuery},
            Difficulty,
        },
    };

    #[tokio::test]
    async fn test_full_tour_lifecycle() {
        let db = create_test_db().await;

        let tour = db.insert_tour(new_tour("The Forest Hiker", 397.0)).await.unwrap();
        assert_eq!(tour.slug, "the-forest-hiker");
        assert_eq!(tour.ratings_quantity, 0);

        let fetched = db.get_tour(&tour.id).await.unwrap().unwrap();
        assert_eq!(fetched, tour);
        let by_slug = db.get_tour_by_slug("the-forest-hiker").await.unwrap().unwrap();
        assert_eq!(by_slug.id, tour.id);

        let patch = TourPatch {
            name: Some("The Forest Runner".into()),
            price: Some(450.0),
            ..TourPatch::default()
        };
        let updated = db.update_tour(&tour.id, patch).await.unwrap();
        assert_eq!(updated.slug, "the-forest-runner");
        assert_eq!(updated.price, 450.0);

        assert!(db.delete_tour(&tour.id).await.unwrap());
        assert!(db.get_tour(&tour.id).await.unwrap().is_none());
        assert!(!db.delete_tour(&tour.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_tour_name_conflicts() {
        let db = create_test_db().await;
        db.insert_tour(new_tour("The Sea Explorer", 497.0)).await.unwrap();
        let err = db
            .insert_tour(new_tour("The Sea Explorer", 300.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m.starts_with("name")));

        // Different names, same slug.
        db.insert_tour(new_tour("Sun Seeker!", 200.0)).await.unwrap();
        let err = db.insert_tour(new_tour("Sun Seeker?", 200.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "slug: \"sun-seeker\""));
    }

    #[tokio::test]
    async fn test_secret_tours_hidden_from_public_lookups() {
        let db = create_test_db().await;
        let mut secret = new_tour("The Hidden Cove", 900.0);
        secret.secret_tour = true;
        let secret = db.insert_tour(secret).await.unwrap();

        assert!(db.get_tour(&secret.id).await.unwrap().is_some());
        assert!(db.get_public_tour(&secret.id).await.unwrap().is_none());
        assert!(db.get_tour_by_slug("the-hidden-cove").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_huge_page_number_is_just_empty() {
        let db = create_test_db().await;
        db.insert_tour(new_tour("The Park Camper", 1497.0)).await.unwrap();

        let tours = db
            .list_tours(&TourQuery {
                page: Some(u32::MAX),
                limit: Some(100),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        assert!(tours.is_empty());
    }

    #[tokio::test]
    async fn test_listing_filters_sorts_and_pages() {
        let db = create_test_db().await;
        db.insert_tour(new_tour("The City Wanderer", 299.0)).await.unwrap();
        db.insert_tour(new_tour("The Forest Hiker", 397.0)).await.unwrap();
        db.insert_tour(new_tour("The Wine Taster", 799.0)).await.unwrap();
        let mut secret = new_tour("The Secret Island", 100.0);
        secret.secret_tour = true;
        db.insert_tour(secret).await.unwrap();

        let cheap_first = db
            .list_tours(&TourQuery {
                sort: Some("price".into()),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = cheap_first.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["The City Wanderer", "The Forest Hiker", "The Wine Taster"]);

        let filtered = db
            .list_tours(&TourQuery {
                price_gte: Some(300.0),
                price_lte: Some(800.0),
                sort: Some("-price".into()),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].name, "The Wine Taster");

        let second_page = db
            .list_tours(&TourQuery {
                sort: Some("price".into()),
                limit: Some(2),
                page: Some(2),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].name, "The Wine Taster");

        let searched = db
            .list_tours(&TourQuery {
                search: Some("WINE".into()),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);

        let by_difficulty = db
            .list_tours(&TourQuery {
                difficulty: Some(Difficulty::Difficult),
                ..TourQuery::default()
            })
            .await
            .unwrap();
        assert!(by_difficulty.is_empty());
    }

    #[tokio::test]
    async fn test_tour_stats_group_by_difficulty() {
        let db = create_test_db().await;
        db.insert_tour(new_tour("The City Wanderer", 300.0)).await.unwrap();
        db.insert_tour(new_tour("The Forest Hiker", 500.0)).await.unwrap();
        let mut hard = new_tour("The Snow Adventurer", 900.0);
        hard.difficulty = Difficulty::Difficult;
        db.insert_tour(hard).await.unwrap();

        let stats = db.tour_stats().await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].difficulty, Difficulty::Easy);
        assert_eq!(stats[0].num_tours, 2);
        assert_eq!(stats[0].avg_price, 400.0);
        assert_eq!(stats[0].min_price, 300.0);
        assert_eq!(stats[1].max_price, 900.0);
    }
}
