use std::path::Path;

/// Derives the URL slug for a recipe title. Lowercases, strips everything
/// outside ascii alphanumerics, whitespace and hyphens, then collapses
/// whitespace runs into single hyphens. Not guaranteed unique.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Recipe content is stored with literal `\n` escapes instead of newlines.
pub fn escape_content(content: &str) -> String {
    content.replace('\n', "\\n")
}

pub fn unescape_content(content: &str) -> String {
    content.replace("\\n", "\n")
}

pub fn file_extension(filename: &str) -> &str {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_lowercases() {
        assert_eq!(slugify("Soy Sauce Chicken!!"), "soy-sauce-chicken");
        assert_eq!(slugify("No-oven soy sauce chicken"), "no-oven-soy-sauce-chicken");
    }

    #[test]
    fn slugify_collapses_whitespace_runs() {
        assert_eq!(slugify("  Soy   Sauce \t Chicken  "), "soy-sauce-chicken");
    }

    #[test]
    fn slugify_output_stays_in_charset() {
        let slug = slugify("Grandma's famous Glögi (v2), now_with_more umlauts äö!");
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn content_escape_round_trips() {
        let content = "Ingredients:\n\nSteps:\n\nTips:";
        assert_eq!(escape_content(content), "Ingredients:\\n\\nSteps:\\n\\nTips:");
        assert_eq!(unescape_content(&escape_content(content)), content);
    }

    #[test]
    fn file_extension_falls_back() {
        assert_eq!(file_extension("dinner.JPG"), "JPG");
        assert_eq!(file_extension("clip.mp4"), "mp4");
        assert_eq!(file_extension("no-extension"), "bin");
    }
}
