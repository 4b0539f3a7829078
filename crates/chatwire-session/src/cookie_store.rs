//! Cookie persistence.
//!
//! One JSON file in the temp dir holding the structured cookie records from
//! the last authenticated session. A stale or mismatched set is not an
//! error here; the browser rejects individual cookies at replay time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatwire_cdp::Cookie;
use chatwire_core::Result;

#[derive(Debug, Serialize, Deserialize)]
struct CookieFile {
    saved_at: String,
    cookies: Vec<Cookie>,
}

/// Load/save handle for the cookie file.
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored cookies, or `None` when the file is missing or unreadable.
    /// A corrupt file is treated as "no cookies" so login falls back to the
    /// interactive path instead of failing.
    pub fn load(&self) -> Option<Vec<Cookie>> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<CookieFile>(&data) {
            Ok(file) => {
                debug!(
                    count = file.cookies.len(),
                    saved_at = %file.saved_at,
                    "loaded cookie file"
                );
                Some(file.cookies)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt cookie file ignored");
                None
            }
        }
    }

    /// Overwrite the cookie file with the current set.
    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = CookieFile {
            saved_at: chrono::Utc::now().to_rfc3339(),
            cookies: cookies.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        debug!(count = cookies.len(), "cookie file saved");
        Ok(())
    }

    /// Delete the cookie file, forcing the next run through interactive login.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cookie(name: &str) -> Cookie {
        Cookie {
            name: name.into(),
            value: "v".into(),
            domain: ".chat.openai.com".into(),
            path: "/".into(),
            expires: Some(2_000_000_000.0),
            secure: true,
            http_only: true,
            same_site: Some("Lax".into()),
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        store
            .save(&[sample_cookie("__session"), sample_cookie("csrf")])
            .unwrap();

        let cookies = store.load().unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "__session");
        assert_eq!(cookies[0].domain, ".chat.openai.com");
    }

    #[test]
    fn test_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json {{{").unwrap();
        let store = CookieStore::new(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        store.save(&[sample_cookie("a")]).unwrap();
        store.save(&[sample_cookie("b")]).unwrap();
        let cookies = store.load().unwrap();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "b");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().join("cookies.json"));
        store.save(&[sample_cookie("a")]).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
