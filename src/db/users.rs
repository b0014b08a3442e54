use crate::db::{credentials, is_unique_violation};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_user(pool: &SqlitePool, user: &User) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO users (id, username, display_name, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::AlreadyExists(format!("User '{}' already exists", user.username))
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(())
}

/// Look up a user by username, with its credentials loaded
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<User> {
    let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::UserNotFound(format!("User '{}' not found", username)),
            _ => AppError::Database(e),
        })?;

    user.credentials = credentials::find_by_user_id(pool, user.id).await?;

    Ok(user)
}

/// Look up a user by its handle, with its credentials loaded
pub async fn find_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<User> {
    let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                AppError::UserNotFound(format!("User with id '{}' not found", user_id))
            }
            _ => AppError::Database(e),
        })?;

    user.credentials = credentials::find_by_user_id(pool, user.id).await?;

    Ok(user)
}

/// Persist the display name and bump `updated_at`
pub async fn update_user(pool: &SqlitePool, user: &User) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET display_name = ?, updated_at = ? WHERE id = ?")
        .bind(&user.display_name)
        .bind(Utc::now().to_rfc3339())
        .bind(user.id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::UserNotFound(format!(
            "User with id '{}' not found",
            user.id
        )));
    }

    Ok(())
}
