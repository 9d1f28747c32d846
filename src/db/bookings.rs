use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    new_id, now, now_millis, timestamp,
    tours::{query_tour, tour_from_row, tour_not_found, TOUR_COLUMNS},
    users::query_user,
    Database,
};
use crate::{
    error::AppError,
    models::{
        booking::{BookingPatch, NewBooking},
        Booking, BookingWithTour, Tour,
    },
};

const BOOKING_COLUMNS: &str =
    "id, tour_id, user_id, price, paid, stripe_session_id, created_at, updated_at";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        tour_id: row.get(1)?,
        user_id: row.get(2)?,
        price: row.get(3)?,
        paid: row.get(4)?,
        stripe_session_id: row.get(5)?,
        created_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
    })
}

fn query_booking(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"),
        [id],
        booking_from_row,
    )
    .optional()
}

fn query_booking_by_session(
    conn: &Connection,
    session_id: &str,
) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE stripe_session_id = ?"),
        [session_id],
        booking_from_row,
    )
    .optional()
}

fn booking_not_found() -> AppError {
    AppError::not_found("No booking found with that ID")
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if price.is_nan() || price < 0.0 {
        return Err(AppError::bad_request("Booking must have a price"));
    }
    Ok(())
}

/// Tour and user must both exist before a booking may point at them.
fn ensure_refs(conn: &Connection, tour_id: &str, user_id: &str) -> Result<(), AppError> {
    if query_tour(conn, tour_id)?.is_none() {
        return Err(tour_not_found());
    }
    if query_user(conn, user_id)?.is_none() {
        return Err(AppError::not_found("No user found with that ID"));
    }
    Ok(())
}

fn insert_booking(
    conn: &Connection,
    tour_id: &str,
    user_id: &str,
    price: f64,
    paid: bool,
    session_id: Option<&str>,
) -> Result<Booking, AppError> {
    let created = now();
    let booking = Booking {
        id: new_id(),
        tour_id: tour_id.to_string(),
        user_id: user_id.to_string(),
        price,
        paid,
        stripe_session_id: session_id.map(str::to_string),
        created_at: created,
        updated_at: created,
    };
    conn.execute(
        "INSERT INTO bookings (id, tour_id, user_id, price, paid, stripe_session_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            booking.id,
            booking.tour_id,
            booking.user_id,
            booking.price,
            booking.paid,
            booking.stripe_session_id,
            created.timestamp_millis(),
            created.timestamp_millis(),
        ],
    )?;
    Ok(booking)
}

impl Database {
    /// Recorded when a checkout session is opened; the webhook flips `paid`.
    pub async fn create_pending_booking(
        &self,
        tour_id: &str,
        user_id: &str,
        price: f64,
        session_id: &str,
    ) -> Result<Booking, AppError> {
        validate_price(price)?;
        let conn = self.conn.lock().await;
        ensure_refs(&conn, tour_id, user_id)?;
        let booking = insert_booking(&conn, tour_id, user_id, price, false, Some(session_id))?;
        debug!("[DB] Pending booking {} for session {session_id}", booking.id);
        Ok(booking)
    }

    pub async fn create_booking(&self, new_booking: NewBooking) -> Result<Booking, AppError> {
        validate_price(new_booking.price)?;
        let conn = self.conn.lock().await;
        ensure_refs(&conn, &new_booking.tour, &new_booking.user)?;
        let booking = insert_booking(
            &conn,
            &new_booking.tour,
            &new_booking.user,
            new_booking.price,
            new_booking.paid,
            None,
        )?;
        info!("[DB] Booking {} created manually", booking.id);
        Ok(booking)
    }

    /// `None` when no booking carries this session id. Already-paid bookings
    /// are returned unchanged.
    pub async fn mark_paid(&self, session_id: &str) -> Result<Option<Booking>, AppError> {
        let conn = self.conn.lock().await;
        let Some(mut booking) = query_booking_by_session(&conn, session_id)? else {
            return Ok(None);
        };
        if !booking.paid {
            booking.paid = true;
            booking.updated_at = now();
            conn.execute(
                "UPDATE bookings SET paid = 1, updated_at = ? WHERE id = ?",
                params![booking.updated_at.timestamp_millis(), booking.id],
            )?;
            info!("[DB] Booking {} marked paid", booking.id);
        }
        Ok(Some(booking))
    }

    /// Creates the booking straight from a completed session. Delivering the
    /// same session twice leaves a single paid booking.
    pub async fn create_paid_booking_from_session(
        &self,
        session_id: &str,
        tour_id: &str,
        user_id: &str,
        price: f64,
    ) -> Result<Booking, AppError> {
        validate_price(price)?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        ensure_refs(&tx, tour_id, user_id)?;

        let created = now_millis();
        tx.execute(
            "INSERT INTO bookings (id, tour_id, user_id, price, paid, stripe_session_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?, ?)
             ON CONFLICT(stripe_session_id) DO UPDATE SET paid = 1",
            params![new_id(), tour_id, user_id, price, session_id, created, created],
        )?;
        let booking = query_booking_by_session(&tx, session_id)?
            .ok_or_else(|| AppError::Internal(format!("booking for {session_id} vanished")))?;
        tx.commit()?;

        info!("[DB] Paid booking {} recorded from session", booking.id);
        Ok(booking)
    }

    pub async fn get_booking(&self, id: &str) -> Result<Option<Booking>, AppError> {
        let conn = self.conn.lock().await;
        Ok(query_booking(&conn, id)?)
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, rowid DESC"
        ))?;
        let bookings = stmt
            .query_map([], booking_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    /// Newest first, each with its tour.
    pub async fn list_bookings_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<BookingWithTour>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        ))?;
        let bookings = stmt
            .query_map([user_id], booking_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let tour = query_tour(&conn, &booking.tour_id)?;
            result.push(BookingWithTour { booking, tour });
        }
        Ok(result)
    }

    /// Distinct tours the user holds a booking for.
    pub async fn booked_tours_for_user(&self, user_id: &str) -> Result<Vec<Tour>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOUR_COLUMNS} FROM tours
             WHERE id IN (SELECT tour_id FROM bookings WHERE user_id = ?)
             ORDER BY name ASC"
        ))?;
        let tours = stmt
            .query_map([user_id], tour_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tours)
    }

    pub async fn update_booking(&self, id: &str, patch: BookingPatch) -> Result<Booking, AppError> {
        let conn = self.conn.lock().await;
        let mut booking = query_booking(&conn, id)?.ok_or_else(booking_not_found)?;

        if let Some(price) = patch.price {
            validate_price(price)?;
            booking.price = price;
        }
        if let Some(paid) = patch.paid {
            booking.paid = paid;
        }
        booking.updated_at = now();

        conn.execute(
            "UPDATE bookings SET price = ?, paid = ?, updated_at = ? WHERE id = ?",
            params![
                booking.price,
                booking.paid,
                booking.updated_at.timestamp_millis(),
                booking.id
            ],
        )?;
        Ok(booking)
    }

    pub async fn delete_booking(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM bookings WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::{
        error::AppError,
        models::booking::{BookingPatch, NewBooking},
    };

    #[tokio::test]
    async fn test_pending_booking_is_marked_paid_once() {
        let db = create_test_db().await;
        let tour = db.insert_tour(new_tour("The Forest Hiker", 397.0)).await.unwrap();
        let user = insert_user(&db, "buyer@example.com").await;

        let pending = db
            .create_pending_booking(&tour.id, &user.id, 397.0, "cs_test_1")
            .await
            .unwrap();
        assert!(!pending.paid);

        let paid = db.mark_paid("cs_test_1").await.unwrap().unwrap();
        assert_eq!(paid.id, pending.id);
        assert!(paid.paid);

        let again = db.mark_paid("cs_test_1").await.unwrap().unwrap();
        assert_eq!(again.updated_at, paid.updated_at);

        assert!(db.mark_paid("cs_unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_booking_from_session_is_idempotent() {
        let db = create_test_db().await;
        let tour = db.insert_tour(new_tour("The Wine Taster", 799.0)).await.unwrap();
        let user = insert_user(&db, "wine@example.com").await;

        let first = db
            .create_paid_booking_from_session("cs_test_2", &tour.id, &user.id, 699.0)
            .await
            .unwrap();
        let second = db
            .create_paid_booking_from_session("cs_test_2", &tour.id, &user.id, 699.0)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.paid);
        assert_eq!(db.list_bookings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_bookings_and_tours() {
        let db = create_test_db().await;
        let hiker = db.insert_tour(new_tour("The Forest Hiker", 397.0)).await.unwrap();
        let camper = db.insert_tour(new_tour("The Park Camper", 1097.0)).await.unwrap();
        let user = insert_user(&db, "traveller@example.com").await;
        let other = insert_user(&db, "other@example.com").await;

        for (tour, user_id) in [(&hiker, &user.id), (&hiker, &user.id), (&camper, &other.id)] {
            db.create_booking(NewBooking {
                tour: tour.id.clone(),
                user: user_id.clone(),
                price: tour.price,
                paid: true,
            })
            .await
            .unwrap();
        }

        let mine = db.list_bookings_for_user(&user.id).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].tour.as_ref().unwrap().id, hiker.id);

        let tours = db.booked_tours_for_user(&user.id).await.unwrap();
        assert_eq!(tours.len(), 1);
        assert_eq!(tours[0].name, "The Forest Hiker");
    }

    #[tokio::test]
    async fn test_update_and_delete_booking() {
        let db = create_test_db().await;
        let tour = db.insert_tour(new_tour("The Sports Lover", 399.0)).await.unwrap();
        let user = insert_user(&db, "sporty@example.com").await;
        let booking = db
            .create_booking(NewBooking {
                tour: tour.id.clone(),
                user: user.id.clone(),
                price: 399.0,
                paid: false,
            })
            .await
            .unwrap();

        let updated = db
            .update_booking(
                &booking.id,
                BookingPatch {
                    price: Some(350.0),
                    paid: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 350.0);
        assert!(updated.paid);

        assert!(db.delete_booking(&booking.id).await.unwrap());
        assert!(db.get_booking(&booking.id).await.unwrap().is_none());
        let err = db
            .update_booking(&booking.id, BookingPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_booking_requires_existing_tour() {
        let db = create_test_db().await;
        let user = insert_user(&db, "nobody@example.com").await;
        let err = db
            .create_pending_booking("missing", &user.id, 100.0, "cs_test_3")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
