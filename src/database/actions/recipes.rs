use crate::{
    authentication::permissions::ActionType,
    cache::cache::{CacheKeyType, RedisValue},
    error::{HttpError, QueryError},
    form::Form,
    jwt::SessionData,
    schema::{
        AuthorView, MediaKind, MediaView, Recipe, RecipeMediaRow, RecipePreview, RecipeFull,
        TagCategory, TagView, Uuid,
    },
    storage::bucket::Bucket,
    text::{escape_content, file_extension, slugify},
};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use super::tags::{link_tags, list_recipe_tags};

/// One file attached to a recipe submission, in display order.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything a recipe form submits: title, free-text content, ordered
/// uploads and the selected tag names per category.
#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: String,
    pub content: String,
    pub uploads: Vec<MediaUpload>,
    pub ingredients: Vec<String>,
    pub seasonings: Vec<String>,
    pub techniques: Vec<String>,
}

impl RecipeDraft {
    /// Text fields of the draft; uploads are attached separately by the
    /// route handler.
    pub fn from_form(form: &Form) -> Result<Self, crate::error::Error> {
        Ok(Self {
            title: form.get_str("title")?,
            content: form.get_str("content")?,
            uploads: vec![],
            ingredients: form.get_list("ingredients"),
            seasonings: form.get_list("seasonings"),
            techniques: form.get_list("techniques"),
        })
    }

    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(HttpError::InvalidRequest.new("Title and content required"));
        }
        Ok(())
    }

    /// Flattens the per-category name lists into categorized tags.
    pub fn tags(&self) -> Vec<TagView> {
        let categorized = [
            (TagCategory::Ingredient, &self.ingredients),
            (TagCategory::Seasoning, &self.seasonings),
            (TagCategory::Technique, &self.techniques),
        ];

        categorized
            .into_iter()
            .flat_map(|(category, names)| {
                names.iter().map(move |name| TagView {
                    name: name.to_owned(),
                    category,
                })
            })
            .collect()
    }
}

/// Publishes a new recipe. The row writes (recipe, tag upsert, links) share
/// one transaction, so a tag failure never leaves an orphan recipe; media
/// uploads run after commit and are best-effort.
pub async fn publish_recipe(
    draft: &RecipeDraft,
    author_id: Uuid,
    pool: &Pool<Postgres>,
    bucket: &Bucket,
) -> Result<Recipe, crate::error::Error> {
    draft.validate()?;

    let mut tx = pool.begin().await.map_err(|e| QueryError::from(e).into())?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (title, slug, content, author_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *;
    ",
    )
    .bind(draft.title.trim())
    .bind(slugify(&draft.title))
    .bind(escape_content(&draft.content))
    .bind(author_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    link_tags(recipe.id, &draft.tags(), &mut tx).await?;

    tx.commit().await.map_err(|e| QueryError::from(e).into())?;

    store_recipe_media(recipe.id, &draft.uploads, pool, bucket).await;

    Ok(recipe)
}

/// Edits a recipe in place: same row, same id, recomputed slug. Tag links
/// are replaced within the same transaction. Existing media is kept unless
/// the draft carries replacement uploads.
pub async fn update_recipe(
    recipe_id: Uuid,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
    bucket: &Bucket,
) -> Result<Recipe, crate::error::Error> {
    draft.validate()?;

    let mut tx = pool.begin().await.map_err(|e| QueryError::from(e).into())?;

    let recipe: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET title = $1, slug = $2, content = $3
        WHERE id = $4
        RETURNING *;
    ",
    )
    .bind(draft.title.trim())
    .bind(slugify(&draft.title))
    .bind(escape_content(&draft.content))
    .bind(recipe_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    link_tags(recipe.id, &draft.tags(), &mut tx).await?;

    tx.commit().await.map_err(|e| QueryError::from(e).into())?;

    if !draft.uploads.is_empty() {
        clear_recipe_media(recipe.id, pool, bucket).await;
        store_recipe_media(recipe.id, &draft.uploads, pool, bucket).await;
    }

    Ok(recipe)
}

/// Uploads each file to `recipes/{id}/{index}.{ext}` and records a media
/// row per successful upload. Failures are logged and skipped; a partial
/// media set is an accepted outcome.
pub async fn store_recipe_media(
    recipe_id: Uuid,
    uploads: &[MediaUpload],
    pool: &Pool<Postgres>,
    bucket: &Bucket,
) {
    for (position, upload) in uploads.iter().enumerate() {
        let path = format!(
            "recipes/{}/{}.{}",
            recipe_id,
            position,
            file_extension(&upload.filename)
        );

        if let Err(e) = bucket.upload(&path, &upload.bytes).await {
            log::error!("Failed to upload {path}: {e}");
            continue;
        }

        let result = sqlx::query(
            "
            INSERT INTO recipe_media (recipe_id, file_path, position, media_type)
            VALUES ($1, $2, $3, $4);
        ",
        )
        .bind(recipe_id)
        .bind(&path)
        .bind(position as i32)
        .bind(MediaKind::from_mime(&upload.content_type))
        .execute(pool)
        .await;

        if let Err(e) = result {
            log::error!("Failed to record media row {path}: {e}");
        }
    }
}

/// Removes a recipe's storage folder and media rows. Storage failures are
/// logged; the row delete still runs.
async fn clear_recipe_media(recipe_id: Uuid, pool: &Pool<Postgres>, bucket: &Bucket) {
    let folder = format!("recipes/{recipe_id}");

    match bucket.list(&folder).await {
        Ok(files) if !files.is_empty() => {
            let paths: Vec<String> = files.iter().map(|name| format!("{folder}/{name}")).collect();

            if let Err(e) = bucket.remove(&paths).await {
                log::error!("Failed to delete storage files under {folder}: {e}");
            }
            if let Err(e) = bucket.remove_folder(&folder).await {
                log::error!("Failed to remove storage folder {folder}: {e}");
            }
        }
        Ok(_) => {}
        Err(e) => log::error!("Failed to list storage files under {folder}: {e}"),
    }

    let result = sqlx::query("DELETE FROM recipe_media WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await;

    if let Err(e) = result {
        log::error!("Failed to delete media rows for recipe {recipe_id}: {e}");
    }
}

/// Deletes a recipe: storage objects, media rows, tag links, recipe row.
/// Cleanup is best-effort; the media and recipe rows are removed regardless
/// of storage-listing failures.
pub async fn delete_recipe(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
    bucket: &Bucket,
) -> Result<(), crate::error::Error> {
    clear_recipe_media(recipe_id, pool, bucket).await;

    let result = sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await;

    if let Err(e) = result {
        log::error!("Failed to delete tag links for recipe {recipe_id}: {e}");
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(())
}

pub async fn get_recipe(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Option<Recipe>, crate::error::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    Ok(row)
}

/// Detail page fetch: one recipe by slug with its media (in position
/// order), tags and author embedded.
pub async fn get_recipe_by_slug(
    slug: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeFull>, crate::error::Error> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(|e| QueryError::from(e).into())?;

    let recipe = match recipe {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author: AuthorView = sqlx::query_as(
        "
        SELECT p.id AS id, p.username AS username, p.display_name AS display_name, p.avatar_url AS avatar_url
        FROM profiles p
        WHERE p.id = $1
    ",
    )
    .bind(recipe.author_id)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let media: Vec<RecipeMediaRow> = sqlx::query_as(
        "SELECT * FROM recipe_media WHERE recipe_id = $1 ORDER BY position",
    )
    .bind(recipe.id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let tags = list_recipe_tags(recipe.id, pool).await?;

    Ok(Some(RecipeFull {
        id: recipe.id,
        title: recipe.title,
        slug: recipe.slug,
        content: recipe.content,
        media: media.into_iter().map(MediaView::from).collect(),
        tags,
        author,
    }))
}

/// Read-through variant of `get_recipe_by_slug`; entries drop when a
/// recipe mutation bumps the recipe generation.
pub async fn get_recipe_by_slug_cached(
    slug: &str,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Option<RecipeFull>, crate::error::Error> {
    let pool = pool.clone();
    let lookup_slug = slug.to_string();

    let cached = RedisValue::get_or_optional(
        CacheKeyType::Recipe.new(slug.to_string()),
        cache,
        move || async move { get_recipe_by_slug(&lookup_slug, &pool).await },
    )
    .await?;

    Ok(cached.map(|cached| cached.value))
}

/// Management listing for the author's own pages, newest first. The cover
/// path is the first media attachment, when present.
pub async fn list_own_recipes(
    author_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePreview>, crate::error::Error> {
    let rows: Vec<RecipePreview> = sqlx::query_as(
        "
        SELECT r.id, r.title, r.slug, r.created_at, m.file_path AS cover_path
        FROM recipes r
        LEFT JOIN LATERAL (
            SELECT file_path FROM recipe_media
            WHERE recipe_id = r.id
            ORDER BY position LIMIT 1
        ) m ON true
        WHERE r.author_id = $1
        ORDER BY r.created_at DESC
    ",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Resolves a recipe for mutation, enforcing ownership: managing a recipe
/// requires `ManageOwnRecipes` plus either authorship or
/// `ManageAllRecipes`.
pub async fn get_recipe_mut(
    id: Uuid,
    session: SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, crate::error::Error> {
    let recipe = get_recipe(id, pool).await?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(HttpError::Unauthorized.default())
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(HttpError::InvalidRequest.new("No recipe exists with specified id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn draft_validation_requires_title_and_content() {
        let mut draft = RecipeDraft {
            title: String::from("Soy Sauce Chicken!!"),
            content: String::from("Steps:\nSimmer."),
            ..RecipeDraft::default()
        };
        assert!(draft.validate().is_ok());

        draft.content = String::from("   ");
        assert!(draft.validate().is_err());

        draft.content = String::from("Steps:");
        draft.title = String::new();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn draft_tags_carry_their_category() {
        let draft = RecipeDraft {
            title: String::from("t"),
            content: String::from("c"),
            ingredients: vec![String::from("soy sauce"), String::from("chicken")],
            techniques: vec![String::from("braising")],
            ..RecipeDraft::default()
        };

        let tags = draft.tags();
        assert_eq!(tags.len(), 3);
        assert!(tags.contains(&TagView {
            name: String::from("soy sauce"),
            category: TagCategory::Ingredient,
        }));
        assert!(tags.contains(&TagView {
            name: String::from("braising"),
            category: TagCategory::Technique,
        }));
    }

    #[test]
    fn draft_parses_from_form_fields() {
        let data = [
            ("title", "Soy Sauce Chicken!!"),
            ("content", "Steps:\\nSimmer."),
            ("ingredients", "soy sauce,chicken"),
            ("seasonings", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();

        let draft = RecipeDraft::from_form(&Form::from_data(data)).unwrap();
        assert_eq!(draft.title, "Soy Sauce Chicken!!");
        assert_eq!(draft.ingredients, vec!["soy sauce", "chicken"]);
        assert!(draft.seasonings.is_empty());
        assert!(draft.uploads.is_empty());
    }
}
