use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{HttpError, QueryError},
    schema::{User, Uuid},
};

use sqlx::{Pool, Postgres};

use super::profiles::{get_profile_by_id, touch_last_login, upsert_profile};

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, crate::error::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn get_user_by_id(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, crate::error::Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Creates the auth identity and its public profile in one go. The profile
/// shares the user id; the username falls back to the email local part.
pub async fn register_user(
    email: &str,
    password: &str,
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Uuid, crate::error::Error> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(HttpError::InvalidRequest.new("Email and password are required"));
    }

    let hash = hash_password(password)
        .map_err(|_e| HttpError::InternalServerError.new("Failed to hash password"))?;

    let row: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO users (email, password)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(email.trim())
    .bind(hash)
    .fetch_optional(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let user_id = match row {
        Some(row) => row.0,
        None => return Err(HttpError::InvalidRequest.new("Email is already registered")),
    };

    let username = match username.trim() {
        "" => default_username(email),
        username => username,
    };
    upsert_profile(user_id, username, pool).await?;

    Ok(user_id)
}

/// Verifies credentials, refreshes the profile's last-login stamp and
/// returns a signed session token.
pub async fn login_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, crate::error::Error> {
    let user = match get_user_by_email(email.trim(), pool).await? {
        Some(user) => user,
        None => return Err(HttpError::InvalidRequest.new("Invalid credentials")),
    };

    let authenticated = verify_password(password, &user.password)
        .map_err(|_e| HttpError::InternalServerError.new("Failed to verify password"))?;
    if !authenticated {
        return Err(HttpError::InvalidRequest.new("Invalid credentials"));
    }

    touch_last_login(user.id, pool).await?;

    let username = match get_profile_by_id(user.id, pool).await? {
        Some(profile) => profile.username,
        None => default_username(&user.email).to_string(),
    };

    Ok(generate_jwt_session(&user, &username))
}

fn default_username(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
