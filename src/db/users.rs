use chrono::{DateTime, Duration, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{enum_column, is_unique_violation, new_id, now, now_millis, timestamp, Database};
use crate::{
    error::AppError,
    models::{
        user::{AdminUserUpdate, Credentials},
        Role, User,
    },
};

const USER_COLUMNS: &str =
    "id, name, email, photo, role, active, stripe_customer_id, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        photo: row.get(3)?,
        role: enum_column(row, 4)?,
        active: row.get(5)?,
        stripe_customer_id: row.get(6)?,
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

fn user_with_credentials(row: &Row<'_>) -> rusqlite::Result<(User, Credentials)> {
    let changed: Option<i64> = row.get(10)?;
    Ok((
        user_from_row(row)?,
        Credentials {
            password_hash: row.get(9)?,
            password_changed_at: changed.and_then(DateTime::from_timestamp_millis),
        },
    ))
}

pub(super) fn query_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
        [id],
        user_from_row,
    )
    .optional()
}

fn user_not_found() -> AppError {
    AppError::not_found("No user found with that ID")
}

fn email_conflict(e: rusqlite::Error, email: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict(format!("email: \"{email}\""))
    } else {
        e.into()
    }
}

impl Database {
    /// `email` must already be normalized.
    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, AppError> {
        let created = now();
        let user = User {
            id: new_id(),
            name: name.to_string(),
            email: email.to_string(),
            photo: None,
            role,
            active: true,
            stripe_customer_id: None,
            created_at: created,
            updated_at: created,
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (id, name, email, role, active, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
            params![
                user.id,
                user.name,
                user.email,
                user.role.as_str(),
                password_hash,
                created.timestamp_millis(),
                created.timestamp_millis(),
            ],
        )
        .map_err(|e| email_conflict(e, email))?;

        info!("[DB] User created: {} ({})", user.email, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        Ok(query_user(&conn, id)?)
    }

    pub async fn get_user_with_credentials(
        &self,
        id: &str,
    ) -> Result<Option<(User, Credentials)>, AppError> {
        let conn = self.conn.lock().await;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, password_hash, password_changed_at FROM users WHERE id = ?"
                ),
                [id],
                user_with_credentials,
            )
            .optional()?;
        Ok(found)
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(User, Credentials)>, AppError> {
        let conn = self.conn.lock().await;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, password_hash, password_changed_at FROM users WHERE email = ?"
                ),
                [email],
                user_with_credentials,
            )
            .optional()?;
        Ok(found)
    }

    /// Active accounts only, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE active = 1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub async fn update_user_profile(
        &self,
        id: &str,
        name: Option<String>,
        email: Option<String>,
        photo: Option<String>,
    ) -> Result<User, AppError> {
        let update = AdminUserUpdate {
            name,
            email,
            photo,
            role: None,
            active: None,
        };
        self.admin_update_user(id, update).await
    }

    pub async fn admin_update_user(
        &self,
        id: &str,
        update: AdminUserUpdate,
    ) -> Result<User, AppError> {
        let conn = self.conn.lock().await;
        let mut user = query_user(&conn, id)?.ok_or_else(user_not_found)?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if update.photo.is_some() {
            user.photo = update.photo;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.active {
            user.active = active;
        }
        user.updated_at = now();

        conn.execute(
            "UPDATE users SET name = ?, email = ?, photo = ?, role = ?, active = ?, updated_at = ?
             WHERE id = ?",
            params![
                user.name,
                user.email,
                user.photo,
                user.role.as_str(),
                user.active,
                user.updated_at.timestamp_millis(),
                user.id,
            ],
        )
        .map_err(|e| email_conflict(e, &user.email))?;
        Ok(user)
    }

    pub async fn set_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        let update = AdminUserUpdate {
            role: Some(role),
            ..AdminUserUpdate::default()
        };
        let user = self.admin_update_user(id, update).await?;
        info!("[DB] Role of {} set to {}", user.id, user.role);
        Ok(user)
    }

    pub async fn deactivate_user(&self, id: &str) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE users SET active = 0, updated_at = ? WHERE id = ?",
            params![now_millis(), id],
        )?;
        if changed == 0 {
            return Err(user_not_found());
        }
        info!("[DB] User deactivated: {id}");
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Store a new password hash and invalidate any pending reset token.
    ///
    /// The change time is backdated one second so that a token issued right
    /// after the change is still accepted.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        let changed_at = Utc::now() - Duration::seconds(1);
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE users SET password_hash = ?, password_changed_at = ?,
                password_reset_token = NULL, password_reset_expires = NULL, updated_at = ?
             WHERE id = ?",
            params![password_hash, changed_at.timestamp_millis(), now_millis(), id],
        )?;
        if changed == 0 {
            return Err(user_not_found());
        }
        Ok(())
    }

    /// Pass `None` to clear the token.
    pub async fn set_reset_token(
        &self,
        id: &str,
        token_hash: Option<&str>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET password_reset_token = ?, password_reset_expires = ? WHERE id = ?",
            params![token_hash, expires.map(|e| e.timestamp_millis()), id],
        )?;
        Ok(())
    }

    pub async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE password_reset_token = ? AND password_reset_expires > ? AND active = 1"
                ),
                params![token_hash, now_millis()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub async fn set_stripe_customer_id(&self, id: &str, customer_id: &str) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET stripe_customer_id = ?, updated_at = ? WHERE id = ?",
            params![customer_id, now_millis(), id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::super::test_support::*;
    use crate::{error::AppError, models::Role};

    #[tokio::test]
    async fn test_user_lifecycle() {
        let db = create_test_db().await;
        let user = insert_user(&db, "jonas@example.com").await;
        assert_eq!(user.role, Role::User);
        assert!(user.active);

        let (found, creds) = db.get_user_by_email("jonas@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(creds.password_hash, "not-a-real-hash");
        assert!(creds.password_changed_at.is_none());

        let updated = db
            .update_user_profile(&user.id, Some("Jonas".into()), None, Some("me.jpg".into()))
            .await
            .unwrap();
        assert_eq!(updated.name, "Jonas");
        assert_eq!(updated.photo.as_deref(), Some("me.jpg"));

        let promoted = db.set_role(&user.id, Role::LeadGuide).await.unwrap();
        assert_eq!(promoted.role, Role::LeadGuide);

        db.deactivate_user(&user.id).await.unwrap();
        assert!(db.list_users().await.unwrap().is_empty());
        assert!(db.delete_user(&user.id).await.unwrap());
        assert!(db.get_user(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = create_test_db().await;
        insert_user(&db, "dup@example.com").await;
        let err = db
            .insert_user("Other", "dup@example.com", "hash", Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reset_token_expiry_and_password_change() {
        let db = create_test_db().await;
        let user = insert_user(&db, "reset@example.com").await;

        db.set_reset_token(&user.id, Some("expired"), Some(Utc::now() - Duration::minutes(1)))
            .await
            .unwrap();
        assert!(db.find_by_reset_token("expired").await.unwrap().is_none());

        db.set_reset_token(&user.id, Some("fresh"), Some(Utc::now() + Duration::minutes(10)))
            .await
            .unwrap();
        let found = db.find_by_reset_token("fresh").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        db.set_password(&user.id, "new-hash").await.unwrap();
        assert!(db.find_by_reset_token("fresh").await.unwrap().is_none());
        let (_, creds) = db.get_user_with_credentials(&user.id).await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "new-hash");
        assert!(creds.password_changed_at.is_some());
    }
}
