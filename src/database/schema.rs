use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::error::TypeError;

pub type Uuid = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "tag_category", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Ingredient,
    Seasoning,
    Technique,
}

impl TagCategory {
    pub const ALL: [TagCategory; 3] = [
        TagCategory::Ingredient,
        TagCategory::Seasoning,
        TagCategory::Technique,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TagCategory::Ingredient => "ingredient",
            TagCategory::Seasoning => "seasoning",
            TagCategory::Technique => "technique",
        }
    }
}

impl TryFrom<Value> for TagCategory {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "ingredient" => Ok(Self::Ingredient),
                "seasoning" => Ok(Self::Seasoning),
                "technique" => Ok(Self::Technique),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "media_type", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Uploads are classified by their mime type; anything that is not a
    /// video is stored as an image.
    pub fn from_mime(content_type: &str) -> Self {
        if content_type.starts_with("video") {
            Self::Video
        } else {
            Self::Image
        }
    }
}

impl TryFrom<Value> for MediaKind {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_str() {
            Some(value) => match value {
                "image" => Ok(Self::Image),
                "video" => Ok(Self::Video),
                _ => Err(TypeError::new("Invalid variant")),
            },
            None => Err(TypeError::new("Failed to parse value as string")),
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub last_login: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeMediaRow {
    pub recipe_id: Uuid,
    pub file_path: String,
    pub position: i32,
    pub media_type: MediaKind,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub category: TagCategory,
}

/// Tag link joined with its tag, as read per recipe.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct LinkedTagRow {
    pub recipe_id: Uuid,
    pub name: String,
    pub category: TagCategory,
}

/// Recipe row joined with its author profile, as read by the feed.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct FeedRecipeRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

// View models

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagView {
    pub name: String,
    pub category: TagCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaView {
    pub file_path: String,
    pub position: i32,
    pub media_type: MediaKind,
}

impl From<RecipeMediaRow> for MediaView {
    fn from(row: RecipeMediaRow) -> Self {
        Self {
            file_path: row.file_path,
            position: row.position,
            media_type: row.media_type,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFull {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub media: Vec<MediaView>,
    pub tags: Vec<TagView>,
    pub author: AuthorView,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct RecipePreview {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub cover_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub recipes: Vec<RecipePreview>,
}

/// Feed filter state, parsed from the `author` / `ingredient` / `seasoning`
/// / `technique` route query parameters (tag lists are comma-joined).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedFilter {
    pub author: String,
    pub ingredients: Vec<String>,
    pub seasonings: Vec<String>,
    pub techniques: Vec<String>,
}

impl FeedFilter {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        Self {
            author: params
                .get("author")
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            ingredients: split_tag_list(params.get("ingredient")),
            seasonings: split_tag_list(params.get("seasoning")),
            techniques: split_tag_list(params.get("technique")),
        }
    }

    pub fn selected(&self, category: TagCategory) -> &[String] {
        match category {
            TagCategory::Ingredient => &self.ingredients,
            TagCategory::Seasoning => &self.seasonings,
            TagCategory::Technique => &self.techniques,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_empty()
            && TagCategory::ALL
                .iter()
                .all(|category| self.selected(*category).is_empty())
    }
}

fn split_tag_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|list| {
            list.split(',')
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_category_parses_known_variants() {
        let category = TagCategory::try_from(Value::String(String::from("seasoning"))).unwrap();
        assert_eq!(category, TagCategory::Seasoning);

        assert!(TagCategory::try_from(Value::String(String::from("cuisine"))).is_err());
        assert!(TagCategory::try_from(Value::Null).is_err());
    }

    #[test]
    fn media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Image);
    }

    #[test]
    fn feed_filter_parses_comma_joined_lists() {
        let mut params = HashMap::new();
        params.insert(String::from("author"), String::from("mari"));
        params.insert(String::from("ingredient"), String::from("soy sauce, chicken ,"));

        let filter = FeedFilter::from_query(&params);
        assert_eq!(filter.author, "mari");
        assert_eq!(filter.ingredients, vec!["soy sauce", "chicken"]);
        assert!(filter.seasonings.is_empty());
        assert!(!filter.is_empty());

        let empty = FeedFilter::from_query(&HashMap::new());
        assert!(empty.is_empty());
    }
}
