use log::info;
use rusqlite::{params, types::ToSql, OptionalExtension, Row};

use super::{
    is_unique_violation, new_id, now, timestamp,
    tours::{query_tour, refresh_tour_ratings, tour_not_found},
    Database,
};
use crate::{
    error::AppError,
    models::{
        review::{validate_rating, validate_review, ReviewAuthor, ReviewPatch},
        Review, ReviewWithAuthor,
    },
};

const REVIEW_COLUMNS: &str =
    "r.id, r.tour_id, r.user_id, r.review, r.rating, r.created_at, r.updated_at";

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        tour_id: row.get(1)?,
        user_id: row.get(2)?,
        review: row.get(3)?,
        rating: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

fn review_with_author(row: &Row<'_>) -> rusqlite::Result<ReviewWithAuthor> {
    let name: Option<String> = row.get(7)?;
    let photo: Option<String> = row.get(8)?;
    Ok(ReviewWithAuthor {
        review: review_from_row(row)?,
        user: name.map(|name| ReviewAuthor { name, photo }),
    })
}

impl Database {
    /// One review per user per tour; the tour's rating aggregate is updated
    /// in the same transaction.
    pub async fn insert_review(
        &self,
        tour_id: &str,
        user_id: &str,
        text: &str,
        rating: f64,
    ) -> Result<Review, AppError> {
        validate_review(text, rating)?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        if query_tour(&tx, tour_id)?.is_none() {
            return Err(tour_not_found());
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM reviews WHERE tour_id = ? AND user_id = ?",
                [tour_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(AppError::DuplicateReview);
        }

        let created = now();
        let review = Review {
            id: new_id(),
            tour_id: tour_id.to_string(),
            user_id: user_id.to_string(),
            review: text.trim().to_string(),
            rating,
            created_at: created,
            updated_at: created,
        };

        tx.execute(
            "INSERT INTO reviews (id, tour_id, user_id, review, rating, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                review.id,
                review.tour_id,
                review.user_id,
                review.review,
                review.rating,
                created.timestamp_millis(),
                created.timestamp_millis(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateReview
            } else {
                e.into()
            }
        })?;

        refresh_tour_ratings(&tx, tour_id)?;
        tx.commit()?;

        info!("[DB] Review {} created for tour {tour_id}", review.id);
        Ok(review)
    }

    pub async fn get_review(&self, id: &str) -> Result<Option<Review>, AppError> {
        let conn = self.conn.lock().await;
        let review = conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = ?"),
                [id],
                review_from_row,
            )
            .optional()?;
        Ok(review)
    }

    /// Newest first, with the author's name and photo.
    pub async fn list_reviews(
        &self,
        tour_id: Option<&str>,
    ) -> Result<Vec<ReviewWithAuthor>, AppError> {
        let filter = if tour_id.is_some() {
            "WHERE r.tour_id = ?"
        } else {
            ""
        };
        let sql = format!(
            "SELECT {REVIEW_COLUMNS}, u.name, u.photo
             FROM reviews r
             LEFT JOIN users u ON u.id = r.user_id
             {filter}
             ORDER BY r.created_at DESC, r.rowid DESC"
        );

        let conn = self.conn.lock().await;
        let args: Vec<&dyn ToSql> = match &tour_id {
            Some(id) => vec![id as &dyn ToSql],
            None => vec![],
        };
        let mut stmt = conn.prepare(&sql)?;
        let reviews = stmt
            .query_map(args.as_slice(), review_with_author)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    pub async fn update_review(&self, id: &str, patch: ReviewPatch) -> Result<Review, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let mut review = tx
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = ?"),
                [id],
                review_from_row,
            )
            .optional()?
            .ok_or_else(|| AppError::not_found("No review found with that ID"))?;

        if let Some(text) = patch.review {
            validate_review(&text, review.rating)?;
            review.review = text.trim().to_string();
        }
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
            review.rating = rating;
        }
        review.updated_at = now();

        tx.execute(
            "UPDATE reviews SET review = ?, rating = ?, updated_at = ? WHERE id = ?",
            params![
                review.review,
                review.rating,
                review.updated_at.timestamp_millis(),
                review.id
            ],
        )?;
        refresh_tour_ratings(&tx, &review.tour_id)?;
        tx.commit()?;
        Ok(review)
    }

    /// Returns the removed review, if there was one.
    pub async fn delete_review(&self, id: &str) -> Result<Option<Review>, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let review = tx
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = ?"),
                [id],
                review_from_row,
            )
            .optional()?;

        if let Some(review) = &review {
            tx.execute("DELETE FROM reviews WHERE id = ?", [id])?;
            refresh_tour_ratings(&tx, &review.tour_id)?;
        }
        tx.commit()?;
        Ok(review)
    }
}
