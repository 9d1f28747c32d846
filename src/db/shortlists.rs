use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    now, timestamp,
    tours::{query_tour, tour_from_row, tour_not_found, TOUR_COLUMNS},
    Database,
};
use crate::{
    error::AppError,
    models::{ShortlistEntry, ShortlistKind},
};

fn contains(
    conn: &Connection,
    user_id: &str,
    kind: ShortlistKind,
    tour_id: &str,
) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM shortlists WHERE user_id = ? AND kind = ? AND tour_id = ?",
            params![user_id, kind.as_str(), tour_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn count(conn: &Connection, user_id: &str, kind: ShortlistKind) -> rusqlite::Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM shortlists WHERE user_id = ? AND kind = ?",
        params![user_id, kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

fn add(
    conn: &Connection,
    user_id: &str,
    kind: ShortlistKind,
    tour_id: &str,
) -> Result<(), AppError> {
    if query_tour(conn, tour_id)?.is_none() {
        return Err(tour_not_found());
    }

    match kind {
        ShortlistKind::Wishlist => {
            conn.execute(
                "INSERT OR IGNORE INTO shortlists (user_id, kind, tour_id, added_at)
                 VALUES (?, ?, ?, ?)",
                params![user_id, kind.as_str(), tour_id, now().timestamp_millis()],
            )?;
        }
        ShortlistKind::Comparison => {
            if contains(conn, user_id, kind, tour_id)? {
                return Ok(());
            }
            if let Some(max) = kind.capacity() {
                if count(conn, user_id, kind)? >= max {
                    return Err(AppError::bad_request(format!(
                        "You can compare at most {max} tours"
                    )));
                }
            }
            conn.execute(
                "INSERT INTO shortlists (user_id, kind, tour_id, added_at) VALUES (?, ?, ?, ?)",
                params![user_id, kind.as_str(), tour_id, now().timestamp_millis()],
            )?;
        }
        ShortlistKind::Recent => {
            // Re-inserting moves the tour to the front; rowid breaks ties
            // between views in the same millisecond.
            conn.execute(
                "DELETE FROM shortlists WHERE user_id = ? AND kind = ? AND tour_id = ?",
                params![user_id, kind.as_str(), tour_id],
            )?;
            conn.execute(
                "INSERT INTO shortlists (user_id, kind, tour_id, added_at) VALUES (?, ?, ?, ?)",
                params![user_id, kind.as_str(), tour_id, now().timestamp_millis()],
            )?;
            if let Some(max) = kind.capacity() {
                conn.execute(
                    "DELETE FROM shortlists WHERE user_id = ?1 AND kind = ?2 AND rowid NOT IN (
                        SELECT rowid FROM shortlists WHERE user_id = ?1 AND kind = ?2
                        ORDER BY added_at DESC, rowid DESC LIMIT ?3
                     )",
                    params![user_id, kind.as_str(), max as i64],
                )?;
            }
        }
    }
    Ok(())
}

impl Database {
    pub async fn add_to_shortlist(
        &self,
        user_id: &str,
        kind: ShortlistKind,
        tour_id: &str,
    ) -> Result<(), AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        add(&tx, user_id, kind, tour_id)?;
        tx.commit()?;
        debug!("[DB] {tour_id} added to {} of {user_id}", kind.as_str());
        Ok(())
    }

    /// Returns whether the tour was on the list.
    pub async fn remove_from_shortlist(
        &self,
        user_id: &str,
        kind: ShortlistKind,
        tour_id: &str,
    ) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM shortlists WHERE user_id = ? AND kind = ? AND tour_id = ?",
            params![user_id, kind.as_str(), tour_id],
        )?;
        Ok(removed > 0)
    }

    /// Returns the membership after toggling.
    pub async fn toggle_shortlist(
        &self,
        user_id: &str,
        kind: ShortlistKind,
        tour_id: &str,
    ) -> Result<bool, AppError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let member = if contains(&tx, user_id, kind, tour_id)? {
            tx.execute(
                "DELETE FROM shortlists WHERE user_id = ? AND kind = ? AND tour_id = ?",
                params![user_id, kind.as_str(), tour_id],
            )?;
            false
        } else {
            add(&tx, user_id, kind, tour_id)?;
            true
        };
        tx.commit()?;
        Ok(member)
    }

    /// Most recently added first.
    pub async fn list_shortlist(
        &self,
        user_id: &str,
        kind: ShortlistKind,
    ) -> Result<Vec<ShortlistEntry>, AppError> {
        let columns = TOUR_COLUMNS
            .split(", ")
            .map(|c| format!("t.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {columns}, s.added_at
             FROM shortlists s JOIN tours t ON t.id = s.tour_id
             WHERE s.user_id = ? AND s.kind = ?
             ORDER BY s.added_at DESC, s.rowid DESC"
        ))?;
        let entries = stmt
            .query_map(params![user_id, kind.as_str()], |row| {
                let tour = tour_from_row(row)?;
                Ok(ShortlistEntry {
                    tour_id: tour.id.clone(),
                    added_at: timestamp(row, 21)?,
                    tour,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub async fn clear_shortlist(
        &self,
        user_id: &str,
        kind: ShortlistKind,
    ) -> Result<usize, AppError> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM shortlists WHERE user_id = ? AND kind = ?",
            params![user_id, kind.as_str()],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::{error::AppError, models::ShortlistKind};

    #[tokio::test]
    async fn test_comparison_holds_three_tours() {
        let db = create_test_db().await;
        let user = insert_user(&db, "compare@example.com").await;
        let mut ids = Vec::new();
        for name in ["The Forest Hiker", "The Sea Explorer", "The Snow Adventurer", "The City Wanderer"] {
            ids.push(db.insert_tour(new_tour(name, 500.0)).await.unwrap().id);
        }

        for id in &ids[..3] {
            db.add_to_shortlist(&user.id, ShortlistKind::Comparison, id).await.unwrap();
        }
        // Already present, so not counted against the limit.
        db.add_to_shortlist(&user.id, ShortlistKind::Comparison, &ids[0]).await.unwrap();

        let err = db
            .add_to_shortlist(&user.id, ShortlistKind::Comparison, &ids[3])
            .await
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert_eq!(msg, "You can compare at most 3 tours"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.list_shortlist(&user.id, ShortlistKind::Comparison).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_recent_keeps_five_most_recent() {
        let db = create_test_db().await;
        let user = insert_user(&db, "recent@example.com").await;
        let mut ids = Vec::new();
        for i in 0..6 {
            let tour = db.insert_tour(new_tour(&format!("Recent Tour {i}"), 300.0)).await.unwrap();
            db.add_to_shortlist(&user.id, ShortlistKind::Recent, &tour.id).await.unwrap();
            ids.push(tour.id);
        }

        let recent = db.list_shortlist(&user.id, ShortlistKind::Recent).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].tour_id, ids[5]);
        assert!(recent.iter().all(|e| e.tour_id != ids[0]));

        db.add_to_shortlist(&user.id, ShortlistKind::Recent, &ids[2]).await.unwrap();
        let recent = db.list_shortlist(&user.id, ShortlistKind::Recent).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].tour_id, ids[2]);
    }

    #[tokio::test]
    async fn test_wishlist_toggle_and_clear() {
        let db = create_test_db().await;
        let user = insert_user(&db, "wish@example.com").await;
        let tour = db.insert_tour(new_tour("The Northern Lights", 1299.0)).await.unwrap();

        db.add_to_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap();
        db.add_to_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap();
        let wishlist = db.list_shortlist(&user.id, ShortlistKind::Wishlist).await.unwrap();
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist[0].tour.name, "The Northern Lights");

        assert!(!db.toggle_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap());
        assert!(db.toggle_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap());

        assert_eq!(db.clear_shortlist(&user.id, ShortlistKind::Wishlist).await.unwrap(), 1);
        assert!(!db.remove_from_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_deleting_tour_drops_entries() {
        let db = create_test_db().await;
        let user = insert_user(&db, "gone@example.com").await;
        let tour = db.insert_tour(new_tour("The City Wanderer", 299.0)).await.unwrap();
        db.add_to_shortlist(&user.id, ShortlistKind::Wishlist, &tour.id).await.unwrap();

        db.delete_tour(&tour.id).await.unwrap();
        assert!(db.list_shortlist(&user.id, ShortlistKind::Wishlist).await.unwrap().is_empty());
    }
}
