use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::{Error, TypeError};

pub type FormData = HashMap<String, Value>;

/// Loosely typed form payload as submitted by the pages; values are pulled
/// out field by field with the expected type.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => v
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                None => Err(TypeError::new("Failed to parse value as str").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<String, Error> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    /// Comma-joined list field ("soy sauce,chicken"). A missing key is an
    /// empty selection, not an error.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.inner.get(key).and_then(|value| value.as_str()) {
            Some(list) => list
                .split(',')
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
            None => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TagCategory;

    fn form(entries: &[(&str, Value)]) -> Form {
        Form::from_data(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn get_str_rejects_missing_and_non_string_keys() {
        let form = form(&[
            ("title", Value::String(String::from("Karjalanpaisti"))),
            ("position", Value::from(2)),
        ]);

        assert_eq!(form.get_str("title").unwrap(), "Karjalanpaisti");
        assert!(form.get_str("position").is_err());
        assert!(form.get_str("missing").is_err());
    }

    #[test]
    fn get_value_converts_categories() {
        let form = form(&[("category", Value::String(String::from("technique")))]);

        let category: TagCategory = form.get_value("category").unwrap();
        assert_eq!(category, TagCategory::Technique);
    }

    #[test]
    fn get_number_parses_stringly_typed_fields() {
        let form = form(&[("position", Value::String(String::from("3")))]);

        let position: i32 = form.get_number("position").unwrap();
        assert_eq!(position, 3);
        assert!(form.get_number::<i32>("missing").is_err());
    }

    #[test]
    fn get_list_splits_and_trims() {
        let form = form(&[("ingredients", Value::String(String::from("soy sauce, chicken ,,")))]);

        assert_eq!(form.get_list("ingredients"), vec!["soy sauce", "chicken"]);
        assert!(form.get_list("seasonings").is_empty());
    }
}
