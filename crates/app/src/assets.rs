use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("no asset base URL configured")]
    NoBaseUrl,

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("asset store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Name-addressed local cache for remote audio assets. A key fetched once
/// is served from disk forever after.
pub struct AssetStore {
    cache_dir: PathBuf,
    base_url: Option<String>,
    http: reqwest::blocking::Client,
}

impl AssetStore {
    pub fn new(cache_dir: PathBuf, base_url: Option<String>) -> Result<Self, AssetError> {
        std::fs::create_dir_all(&cache_dir)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AssetError::Fetch(e.to_string()))?;
        Ok(Self {
            cache_dir,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            http,
        })
    }

    /// Resolve a key to a local file path, downloading on first use.
    pub fn fetch(&self, key: &str) -> Result<PathBuf, AssetError> {
        let file_name = sanitize_key(key);
        let path = self.cache_dir.join(&file_name);

        if path.exists() {
            tracing::debug!("Audio found in local cache: {}", path.display());
            return Ok(path);
        }

        // Full URLs fetch directly; bare keys resolve against the base
        let url = if key.starts_with("http://") || key.starts_with("https://") {
            key.to_string()
        } else {
            let base = self.base_url.as_deref().ok_or(AssetError::NoBaseUrl)?;
            format!("{}/{}", base, key)
        };
        tracing::info!("Downloading asset {} ...", url);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| AssetError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AssetError::Fetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| AssetError::Fetch(e.to_string()))?;

        // Write-then-rename so a partial download never poisons the cache
        let tmp = path.with_extension("part");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &path)?;

        Ok(path)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Keep cache entries inside the cache directory regardless of key shape.
fn sanitize_key(key: &str) -> String {
    let name = key.rsplit(['/', '\\']).next().unwrap_or(key);
    if name.is_empty() {
        "asset".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_returns_existing_file_without_base_url() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chime.wav"), b"RIFF").unwrap();

        let store = AssetStore::new(dir.path().to_path_buf(), None).unwrap();
        let path = store.fetch("chime.wav").expect("cached asset resolves");
        assert_eq!(path, dir.path().join("chime.wav"));
    }

    #[test]
    fn miss_without_base_url_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path().to_path_buf(), None).unwrap();
        assert!(matches!(
            store.fetch("missing.wav"),
            Err(AssetError::NoBaseUrl)
        ));
    }

    #[test]
    fn keys_with_path_components_stay_inside_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("escape.wav"), b"RIFF").unwrap();

        let store = AssetStore::new(dir.path().to_path_buf(), None).unwrap();
        let path = store
            .fetch("../../etc/escape.wav")
            .expect("sanitized key resolves to cached file");
        assert_eq!(path, dir.path().join("escape.wav"));
    }

    #[test]
    fn url_keys_cache_by_final_segment() {
        assert_eq!(sanitize_key("https://cdn/x/y/alarm.wav"), "alarm.wav");
        assert_eq!(sanitize_key("plain.wav"), "plain.wav");
        assert_eq!(sanitize_key(""), "asset");
    }
}
