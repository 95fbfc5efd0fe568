use crate::{
    cache::cache::{CacheKeyType, RedisValue},
    constants::AVATAR_BUCKET,
    error::QueryError,
    schema::{Profile, RecipePreview, UserProfile, Uuid},
    storage::bucket::Bucket,
    text::file_extension,
};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use super::recipes::list_own_recipes;

pub async fn get_profile_by_id(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Profile>, crate::error::Error> {
    let row: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Creates or refreshes the profile row at signup/login time. The id is
/// shared with the auth identity.
pub async fn upsert_profile(
    user_id: Uuid,
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<(), crate::error::Error> {
    sqlx::query(
        "
        INSERT INTO profiles (id, username, last_login)
        VALUES ($1, $2, NOW())
        ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, last_login = NOW();
    ",
    )
    .bind(user_id)
    .bind(username)
    .execute(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

pub async fn touch_last_login(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), crate::error::Error> {
    sqlx::query("UPDATE profiles SET last_login = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

pub async fn update_profile(
    user_id: Uuid,
    display_name: Option<&str>,
    bio: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), crate::error::Error> {
    sqlx::query("UPDATE profiles SET display_name = $1, bio = $2 WHERE id = $3")
        .bind(display_name)
        .bind(bio)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

/// Stores the avatar under a unique name and records its path on the
/// profile. A failed upload is logged and leaves the profile unchanged.
pub async fn upload_avatar(
    user_id: Uuid,
    filename: &str,
    bytes: &[u8],
    pool: &Pool<Postgres>,
    bucket: &Bucket,
) -> Result<Option<String>, crate::error::Error> {
    let path = format!(
        "{}-{}.{}",
        user_id,
        uuid::Uuid::new_v4(),
        file_extension(filename)
    );

    if let Err(e) = bucket.upload(&path, bytes).await {
        log::error!("Avatar upload failed for user {user_id}: {e}");
        return Ok(None);
    }

    sqlx::query("UPDATE profiles SET avatar_url = $1 WHERE id = $2")
        .bind(&path)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(Some(path))
}

/// Public profile page data: the profile plus its recipes, newest first.
pub async fn get_profile(
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<UserProfile>, crate::error::Error> {
    let profile: Option<Profile> = sqlx::query_as("SELECT * FROM profiles WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let profile = match profile {
        Some(profile) => profile,
        None => return Ok(None),
    };

    let recipes: Vec<RecipePreview> = list_own_recipes(profile.id, pool).await?;

    Ok(Some(UserProfile {
        id: profile.id,
        username: profile.username,
        display_name: profile.display_name,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        recipes,
    }))
}

/// Read-through variant of `get_profile`; entries drop when a profile
/// mutation bumps the profile generation.
pub async fn get_profile_cached(
    username: &str,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Option<UserProfile>, crate::error::Error> {
    let pool = pool.clone();
    let lookup_username = username.to_string();

    let cached = RedisValue::get_or_optional(
        CacheKeyType::Profile.new(username.to_string()),
        cache,
        move || async move { get_profile(&lookup_username, &pool).await },
    )
    .await?;

    Ok(cached.map(|cached| cached.value))
}

/// Avatar paths live in the avatars bucket; missing avatars resolve to the
/// published fallback image on the consumer side.
pub fn avatar_public_url(avatar_path: &str) -> String {
    Bucket::new(AVATAR_BUCKET).public_url(avatar_path)
}
