pub const MEDIA_BUCKET: &str = "recipe-media";
pub const AVATAR_BUCKET: &str = "avatars";

pub const SESSION_COOKIE: &str = "session";

pub const TAG_SUGGESTION_LIMIT: i64 = 8;
pub const TAG_SUGGESTION_DEBOUNCE_MS: u64 = 300;

pub const TAG_CATEGORIES: &[(&str, &str)] = &[
    ("ingredient", "Ingredients"),
    ("seasoning", "Seasonings"),
    ("technique", "Techniques"),
];

pub const MEDIA_KINDS: &[(&str, &str)] = &[("image", "Image"), ("video", "Video")];

pub const FALLBACK_IMAGE: &str = "/images/fallback-recipe.jpg";
pub const FALLBACK_AVATAR: &str = "/images/fallback-avatar.png";
