use crate::{
    constants::TAG_SUGGESTION_LIMIT,
    error::QueryError,
    schema::{TagCategory, TagRow, TagView, Uuid},
};

use sqlx::{Pool, Postgres, Transaction};

/// Upserts a tag by its (name, category) identity and returns its id.
/// Upserting the same pair twice yields the same row.
pub async fn upsert_tag(
    name: &str,
    category: TagCategory,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Uuid, crate::error::Error> {
    let id: (i32,) = sqlx::query_as(
        "
        INSERT INTO tags (name, category)
        VALUES ($1, $2)
        ON CONFLICT (name, category) DO UPDATE SET name = EXCLUDED.name
        RETURNING id;
    ",
    )
    .bind(name)
    .bind(category)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(id.0)
}

/// Upserts every submitted tag and links it to the recipe. Runs inside the
/// caller's transaction so a failed link never leaves an orphan recipe.
pub async fn link_tags(
    recipe_id: Uuid,
    tags: &[TagView],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), crate::error::Error> {
    for tag in tags {
        let tag_id = upsert_tag(&tag.name, tag.category, tx).await?;

        sqlx::query(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(recipe_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;
    }

    Ok(())
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<TagRow>, crate::error::Error> {
    let row: Option<TagRow> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

pub async fn find_tag(
    name: &str,
    category: TagCategory,
    pool: &Pool<Postgres>,
) -> Result<Option<Uuid>, crate::error::Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM tags WHERE name = $1 AND category = $2")
            .bind(name)
            .bind(category)
            .fetch_optional(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    Ok(row.map(|tag| tag.0))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<TagRow>, crate::error::Error> {
    let list: Vec<TagRow> = sqlx::query_as("SELECT * FROM tags ORDER BY category, name")
        .fetch_all(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

pub async fn list_recipe_tags(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<TagView>, crate::error::Error> {
    let list: Vec<TagView> = sqlx::query_as(
        "
        SELECT t.name AS name, t.category AS category
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(list)
}

/// Autocomplete lookup for the tag input. Case-insensitive substring match
/// within one category, already-selected names excluded, capped at
/// `TAG_SUGGESTION_LIMIT`. The caller is expected to debounce keystrokes
/// (`TAG_SUGGESTION_DEBOUNCE_MS`).
pub async fn suggest_tags(
    category: TagCategory,
    query: &str,
    selected: &[String],
    pool: &Pool<Postgres>,
) -> Result<Vec<String>, crate::error::Error> {
    if query.trim().is_empty() {
        return Ok(vec![]);
    }

    let pattern = format!("%{}%", query.trim());
    let rows: Vec<(String,)> = sqlx::query_as(
        "
        SELECT name FROM tags
        WHERE category = $1 AND name ILIKE $2 AND name <> ALL($3)
        ORDER BY name
        LIMIT $4
    ",
    )
    .bind(category)
    .bind(pattern)
    .bind(selected)
    .bind(TAG_SUGGESTION_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
