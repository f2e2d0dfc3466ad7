//! Screenshot file storage.
//!
//! Screenshots are PNG files in a single directory, referenced elsewhere by
//! bare filename.

use crate::error::Result;
use aivis_core::{Engine, Timestamp};
use std::io;
use std::path::{Path, PathBuf};

/// Owns the screenshot directory.
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    /// Store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store from the `[storage]` config section.
    #[must_use]
    pub fn from_config(config: &aivis_core::StorageConfig) -> Self {
        Self::new(config.screenshot_dir.clone())
    }

    /// Screenshot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{engine}_{unixMillis}`, the stem for a successful capture.
    #[must_use]
    pub fn success_stem(engine: Engine) -> String {
        format!("{}_{}", engine.slug(), Timestamp::now().unix_millis())
    }

    /// `{engine}_error_{unixMillis}`, the stem for a failure capture.
    #[must_use]
    pub fn error_stem(engine: Engine) -> String {
        format!("{}_error_{}", engine.slug(), Timestamp::now().unix_millis())
    }

    /// Write PNG bytes as `{stem}.png` and return the filename.
    pub async fn save_png(&self, bytes: &[u8], stem: &str) -> Result<String> {
        let filename = format!("{stem}.png");
        let path = self.path_for(&filename)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Screenshot saved");
        Ok(filename)
    }

    /// Absolute path of a stored screenshot.
    ///
    /// Rejects names that would escape the screenshot directory.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        let is_plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if !is_plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid screenshot name: {filename}"),
            )
            .into());
        }
        Ok(self.dir.join(filename))
    }

    /// Delete a stored screenshot. Returns `false` if it did not exist.
    pub async fn delete(&self, filename: &str) -> Result<bool> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_creates_directory() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = ScreenshotStore::new(tmp.path().join("shots"));

        let name = store.save_png(b"\x89PNG", "chatgpt_123").await.expect("save");
        assert_eq!(name, "chatgpt_123.png");

        let path = store.path_for(&name).expect("path");
        assert_eq!(std::fs::read(path).expect("read back"), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = ScreenshotStore::new(tmp.path());

        let name = store.save_png(b"png", "perplexity_1").await.expect("save");
        assert!(store.delete(&name).await.expect("delete"));
        assert!(!store.delete(&name).await.expect("second delete"));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let store = ScreenshotStore::new("/tmp/shots");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("a/b.png").is_err());
        assert!(store.path_for("..").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("google_1.png").is_ok());
    }

    #[test]
    fn test_stem_format() {
        let stem = ScreenshotStore::success_stem(Engine::ChatGpt);
        assert!(stem.starts_with("chatgpt_"));
        assert!(stem["chatgpt_".len()..].chars().all(|c| c.is_ascii_digit()));

        let stem = ScreenshotStore::error_stem(Engine::Perplexity);
        assert!(stem.starts_with("perplexity_error_"));
    }
}
