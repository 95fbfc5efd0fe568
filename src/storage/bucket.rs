use std::env;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::{Error, HttpError, StorageError};

/// Filesystem-backed object store. Media and avatars are passed through
/// unmodified; objects live under `{root}/{bucket}/{path}` and are served
/// by the consumer from `{public base}/{bucket}/{path}`.
#[derive(Debug, Clone)]
pub struct Bucket {
    root: PathBuf,
    name: String,
}

impl Bucket {
    /// Bucket rooted at `STORAGE_ROOT` (default `./storage`).
    pub fn new(name: &str) -> Self {
        let root = env::var("STORAGE_ROOT").unwrap_or_else(|_| String::from("./storage"));
        Self::at(root, name)
    }

    pub fn at(root: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            root: root.into(),
            name: name.to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        let base = env::var("PUBLIC_STORAGE_URL").unwrap_or_else(|_| String::from("/storage"));
        format!("{}/{}/{}", base, self.name, path)
    }

    /// Object paths come from user-supplied file names; anything that tries
    /// to walk out of the bucket is rejected.
    fn object_path(&self, path: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if path.is_empty() || escapes {
            return Err(HttpError::InvalidRequest.new("Invalid storage path"));
        }

        Ok(self.root.join(&self.name).join(relative))
    }

    pub async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), Error> {
        let target = self.object_path(path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from(e).into())?;
        }

        fs::write(target, bytes)
            .await
            .map_err(|e| StorageError::from(e).into())?;

        Ok(())
    }

    /// Lists the object names directly under a folder. A missing folder is
    /// an empty listing.
    pub async fn list(&self, folder: &str) -> Result<Vec<String>, Error> {
        let target = self.object_path(folder)?;

        let mut entries = match fs::read_dir(&target).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StorageError::from(e).into()),
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::from(e).into())?
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    pub async fn remove(&self, paths: &[String]) -> Result<(), Error> {
        for path in paths {
            let target = self.object_path(path)?;
            match fs::remove_file(target).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from(e).into()),
            }
        }

        Ok(())
    }

    pub async fn remove_folder(&self, folder: &str) -> Result<(), Error> {
        let target = self.object_path(folder)?;

        match fs::remove_dir_all(target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> (tempfile::TempDir, Bucket) {
        let dir = tempfile::tempdir().unwrap();
        let bucket = Bucket::at(dir.path(), "recipe-media");
        (dir, bucket)
    }

    #[tokio::test]
    async fn upload_list_remove_round_trip() {
        let (_dir, bucket) = bucket();

        bucket.upload("recipes/7/0.jpg", b"front").await.unwrap();
        bucket.upload("recipes/7/1.mp4", b"plating").await.unwrap();

        let files = bucket.list("recipes/7").await.unwrap();
        assert_eq!(files, vec!["0.jpg", "1.mp4"]);

        bucket
            .remove(&[String::from("recipes/7/0.jpg")])
            .await
            .unwrap();
        assert_eq!(bucket.list("recipes/7").await.unwrap(), vec!["1.mp4"]);
    }

    #[tokio::test]
    async fn listing_a_missing_folder_is_empty() {
        let (_dir, bucket) = bucket();
        assert!(bucket.list("recipes/404").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_a_missing_folder_is_not_an_error() {
        let (_dir, bucket) = bucket();
        bucket.remove_folder("recipes/404").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_paths_that_escape_the_bucket() {
        let (_dir, bucket) = bucket();
        assert!(bucket.upload("../outside.jpg", b"x").await.is_err());
        assert!(bucket.list("..").await.is_err());
    }
}
