use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::{Error, HtmlError, TypeError},
};

const DATA_URI_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: String,
}

pub fn is_data_uri(value: &str) -> bool {
    value.starts_with(DATA_URI_PREFIX)
}

/// Parses `data:image/<ext>;base64,<payload>` into the raw bytes and the
/// declared extension.
pub fn decode_data_uri(value: &str) -> Result<DecodedImage, TypeError> {
    if !is_data_uri(value) {
        return Err(TypeError::new("Image must be a data:image URI"));
    }

    let (format, payload) = value
        .split_once(BASE64_MARKER)
        .ok_or_else(|| TypeError::new("Image must be base64 encoded"))?;

    let extension = format
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(TypeError::new("Unsupported image format"));
    }

    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|_e| TypeError::new("Invalid image payload"))?;
    if bytes.is_empty() {
        return Err(TypeError::new("Image is empty"));
    }

    Ok(DecodedImage { bytes, extension })
}

/// Local directory holding uploaded files, plus the public URL it is served
/// under.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        Self {
            root: root.into(),
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a decoded image and returns its path relative to the media root.
    pub async fn save(&self, image: DecodedImage) -> Result<String, Error> {
        let name = format!("{}.{}", uuid::Uuid::new_v4(), image.extension);
        let dir = self.root.join(RECIPE_IMAGE_DIR);

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            log::error!("Failed to create media directory {}: {e}", dir.display());
            HtmlError::InternalServerError.default()
        })?;
        tokio::fs::write(dir.join(&name), &image.bytes)
            .await
            .map_err(|e| {
                log::error!("Failed to store image {name}: {e}");
                HtmlError::InternalServerError.default()
            })?;

        log::debug!("Stored image {name} ({} bytes)", image.bytes.len());
        Ok(format!("{RECIPE_IMAGE_DIR}/{name}"))
    }

    /// Turns the `image` field of a recipe payload into a stored media path.
    /// Data URIs are decoded and written. Any other value must point at
    /// `current`, the image the recipe already owns, so a recipe never
    /// adopts a file that another recipe may later remove.
    pub async fn resolve(&self, value: &str, current: Option<&str>) -> Result<String, Error> {
        if is_data_uri(value) {
            let image = decode_data_uri(value)?;
            return self.save(image).await;
        }

        let path = value
            .strip_prefix(&self.url)
            .unwrap_or(value)
            .trim_start_matches('/');
        match current {
            Some(current) if !path.is_empty() && path == current => Ok(path.to_string()),
            _ => Err(HtmlError::InvalidRequest.new("Image must be a data:image URI")),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.url, path)
    }

    /// Best effort; a missing file is not an error.
    pub async fn remove(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
            log::warn!("Failed to remove media file {path}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_extension_and_bytes() {
        let image = decode_data_uri(&format!("data:image/png;base64,{PIXEL}")).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(decode_data_uri("recipes/a.png").is_err());
        assert!(decode_data_uri("data:image/png,abc").is_err());
        assert!(decode_data_uri("data:image/exe;base64,AAAA").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
        assert!(decode_data_uri("data:image/png;base64,").is_err());
    }

    #[tokio::test]
    async fn saves_data_uri_under_recipe_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media/");

        let path = store
            .resolve(&format!("data:image/png;base64,{PIXEL}"), None)
            .await
            .unwrap();

        assert!(path.starts_with("recipes/"));
        assert!(path.ends_with(".png"));
        assert!(dir.path().join(&path).exists());
        assert_eq!(store.url(&path), format!("/media/{path}"));

        // The owned image can be submitted back, with or without the URL prefix.
        assert_eq!(store.resolve(&path, Some(&path)).await.unwrap(), path);
        assert_eq!(
            store.resolve(&store.url(&path), Some(&path)).await.unwrap(),
            path
        );
    }

    #[tokio::test]
    async fn foreign_files_are_never_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media");
        let uri = format!("data:image/png;base64,{PIXEL}");
        let alice = store.resolve(&uri, None).await.unwrap();
        let bob = store.resolve(&uri, None).await.unwrap();

        assert!(store.resolve(&store.url(&alice), None).await.is_err());
        assert!(store.resolve(&alice, Some(&bob)).await.is_err());
        assert!(store.resolve("../etc/passwd", Some(&bob)).await.is_err());
        assert!(store.resolve("", Some("")).await.is_err());

        store.remove(&bob).await;
        assert!(dir.path().join(&alice).exists());
    }
}
