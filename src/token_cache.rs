//! SSO session token lookup.
//!
//! `aws sso login` writes JSON files into `~/.aws/sso/cache`. The newest file
//! carrying an `accessToken` holds the session token the portal API expects.
//! Client-registration files written next to it have no token and are skipped.

use crate::error::SyncError;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Opaque bearer token for the SSO portal. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    access_token: Option<String>,
    expires_at: Option<String>,
}

fn cache_files(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>, SyncError> {
    let entries = fs::read_dir(dir).map_err(|_| SyncError::NoCacheFound {
        dir: dir.to_path_buf(),
    })?;

    let mut files: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((path, modified))
        })
        .collect();

    // Newest first
    files.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(files)
}

fn warn_if_expired(path: &Path, expires_at: Option<&str>) {
    let Some(raw) = expires_at else {
        return;
    };
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(expiry) if expiry < chrono::Utc::now() => {
            log::warn!("SSO token in {:?} expired at {}", path, raw);
        }
        Ok(_) => {}
        Err(e) => log::debug!("Unparseable expiresAt '{}' in {:?}: {}", raw, path, e),
    }
}

/// Read the access token from the newest cache file in `dir`.
pub fn latest_access_token(dir: &Path) -> Result<SessionToken, SyncError> {
    let files = cache_files(dir)?;
    if files.is_empty() {
        return Err(SyncError::NoCacheFound {
            dir: dir.to_path_buf(),
        });
    }

    for (path, _) in &files {
        let text = fs::read_to_string(path).map_err(|e| SyncError::CacheRead {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable cache file {:?}: {}", path, e);
                continue;
            }
        };
        if let Some(token) = entry.access_token.filter(|t| !t.is_empty()) {
            warn_if_expired(path, entry.expires_at.as_deref());
            log::info!("Using SSO token cache {:?}", path);
            return Ok(SessionToken(token));
        }
    }

    Err(SyncError::NoCacheFound {
        dir: dir.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_with_mtime(path: &Path, body: &str, age_secs: u64) {
        fs::write(path, body).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = latest_access_token(&dir.path().join("cache")).unwrap_err();
        assert!(matches!(err, SyncError::NoCacheFound { .. }));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a cache file").unwrap();
        let err = latest_access_token(dir.path()).unwrap_err();
        assert!(matches!(err, SyncError::NoCacheFound { .. }));
    }

    #[test]
    fn test_newest_token_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(&dir.path().join("old.json"), r#"{"accessToken":"old"}"#, 600);
        write_with_mtime(&dir.path().join("new.json"), r#"{"accessToken":"new"}"#, 10);
        let token = latest_access_token(dir.path()).unwrap();
        assert_eq!(token.expose(), "new");
    }

    #[test]
    fn test_registration_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_with_mtime(
            &dir.path().join("session.json"),
            r#"{"accessToken":"tok","expiresAt":"2099-01-01T00:00:00Z"}"#,
            60,
        );
        write_with_mtime(
            &dir.path().join("botocore-client-id.json"),
            r#"{"clientId":"abc","clientSecret":"def"}"#,
            1,
        );
        assert_eq!(latest_access_token(dir.path()).unwrap().expose(), "tok");
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = SessionToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
    }
}
