use std::collections::HashMap;

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    cache::cache::{CacheKeyType, RedisValue},
    error::QueryError,
    schema::{
        AuthorView, FeedFilter, FeedRecipeRow, LinkedTagRow, MediaView, RecipeFull,
        RecipeMediaRow, TagCategory, TagView, Uuid,
    },
};

/// Loads the whole public feed in one request sequence: every recipe with
/// its tags, media and author embedded, newest first. Filtering happens
/// in memory afterwards (`filter_feed`); there is no pagination.
pub async fn list_feed(pool: &Pool<Postgres>) -> Result<Vec<RecipeFull>, crate::error::Error> {
    let recipes: Vec<FeedRecipeRow> = sqlx::query_as(
        "
        SELECT r.id, r.title, r.slug, r.content, r.created_at,
               p.id AS author_id, p.username, p.display_name, p.avatar_url
        FROM recipes r
        INNER JOIN profiles p ON p.id = r.author_id
        ORDER BY r.created_at DESC
    ",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let media: Vec<RecipeMediaRow> =
        sqlx::query_as("SELECT * FROM recipe_media ORDER BY position")
            .fetch_all(pool)
            .await
            .map_err(|e| QueryError::from(e).into())?;

    let tags: Vec<LinkedTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.name AS name, t.category AS category
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
    ",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    let mut media_map: HashMap<Uuid, Vec<MediaView>> = HashMap::new();
    media.into_iter().for_each(|row| {
        media_map
            .entry(row.recipe_id)
            .or_default()
            .push(row.into());
    });

    let mut tag_map: HashMap<Uuid, Vec<TagView>> = HashMap::new();
    tags.into_iter().for_each(|row| {
        tag_map.entry(row.recipe_id).or_default().push(TagView {
            name: row.name,
            category: row.category,
        });
    });

    Ok(recipes
        .into_iter()
        .map(|row| RecipeFull {
            media: media_map.remove(&row.id).unwrap_or_default(),
            tags: tag_map.remove(&row.id).unwrap_or_default(),
            author: AuthorView {
                id: row.author_id,
                username: row.username,
                display_name: row.display_name,
                avatar_url: row.avatar_url,
            },
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
        })
        .collect())
}

/// Read-through variant of `list_feed`; the cached copy is dropped when a
/// recipe mutation bumps the feed generation.
pub async fn list_feed_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<RecipeFull>, crate::error::Error> {
    let pool = pool.clone();

    let cached = RedisValue::get_or_list(CacheKeyType::Feed.new("all"), cache, move || async move {
        list_feed(&pool).await
    })
    .await?;

    Ok(cached.value)
}

/// The feed predicate. A recipe stays iff its author's username contains
/// the query substring (case-insensitive) and, per tag category with
/// selected filters, every selected name appears among the recipe's tags
/// of that category. Categories are independent filters.
pub fn filter_feed<'a>(recipes: &'a [RecipeFull], filter: &FeedFilter) -> Vec<&'a RecipeFull> {
    recipes
        .iter()
        .filter(|recipe| {
            if !filter.author.is_empty() {
                let username = recipe.author.username.to_lowercase();
                if !username.contains(&filter.author.to_lowercase()) {
                    return false;
                }
            }

            TagCategory::ALL.iter().all(|category| {
                filter.selected(*category).iter().all(|name| {
                    recipe
                        .tags
                        .iter()
                        .any(|tag| tag.category == *category && &tag.name == name)
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: Uuid, username: &str, tags: &[(&str, TagCategory)]) -> RecipeFull {
        RecipeFull {
            id,
            title: format!("Recipe {id}"),
            slug: format!("recipe-{id}"),
            content: String::from("Steps:\\nCook."),
            media: vec![],
            tags: tags
                .iter()
                .map(|(name, category)| TagView {
                    name: name.to_string(),
                    category: *category,
                })
                .collect(),
            author: AuthorView {
                id,
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
            },
        }
    }

    fn ids(recipes: &[&RecipeFull]) -> Vec<Uuid> {
        recipes.iter().map(|r| r.id).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let feed = vec![
            recipe(1, "mari", &[]),
            recipe(2, "pekka", &[("chicken", TagCategory::Ingredient)]),
        ];

        assert_eq!(ids(&filter_feed(&feed, &FeedFilter::default())), vec![1, 2]);
    }

    #[test]
    fn author_match_is_case_insensitive_substring() {
        let feed = vec![recipe(1, "MariKokki", &[]), recipe(2, "pekka", &[])];

        let filter = FeedFilter {
            author: String::from("rikok"),
            ..FeedFilter::default()
        };
        assert_eq!(ids(&filter_feed(&feed, &filter)), vec![1]);
    }

    #[test]
    fn all_selected_tags_of_a_category_must_be_present() {
        let feed = vec![
            recipe(
                1,
                "mari",
                &[
                    ("soy sauce", TagCategory::Ingredient),
                    ("chicken", TagCategory::Ingredient),
                ],
            ),
            recipe(2, "mari", &[("soy sauce", TagCategory::Ingredient)]),
        ];

        let filter = FeedFilter {
            ingredients: vec![String::from("soy sauce"), String::from("chicken")],
            ..FeedFilter::default()
        };
        assert_eq!(ids(&filter_feed(&feed, &filter)), vec![1]);

        let filter = FeedFilter {
            ingredients: vec![String::from("soy sauce")],
            ..FeedFilter::default()
        };
        assert_eq!(ids(&filter_feed(&feed, &filter)), vec![1, 2]);
    }

    #[test]
    fn tag_categories_filter_independently() {
        let feed = vec![
            recipe(
                1,
                "mari",
                &[
                    ("chicken", TagCategory::Ingredient),
                    ("braising", TagCategory::Technique),
                ],
            ),
            // same name, wrong category
            recipe(2, "mari", &[("braising", TagCategory::Ingredient)]),
        ];

        let filter = FeedFilter {
            techniques: vec![String::from("braising")],
            ..FeedFilter::default()
        };
        assert_eq!(ids(&filter_feed(&feed, &filter)), vec![1]);
    }

    #[test]
    fn author_and_tag_filters_combine() {
        let feed = vec![
            recipe(1, "mari", &[("chicken", TagCategory::Ingredient)]),
            recipe(2, "pekka", &[("chicken", TagCategory::Ingredient)]),
            recipe(3, "mari", &[]),
        ];

        let filter = FeedFilter {
            author: String::from("mari"),
            ingredients: vec![String::from("chicken")],
            ..FeedFilter::default()
        };
        assert_eq!(ids(&filter_feed(&feed, &filter)), vec![1]);
    }
}
