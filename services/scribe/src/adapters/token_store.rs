//! services/scribe/src/adapters/token_store.rs
//!
//! Durable extension storage backed by a JSON file. Only the auth credential
//! lives here, under the `supabaseToken` key; other keys in the file are kept.

use async_trait::async_trait;
use scribe_core::{AuthToken, PortError, PortResult, TokenStore};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub const TOKEN_KEY: &str = "supabaseToken";

pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> PortResult<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PortError::Unexpected(format!("{} is corrupt: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(PortError::Unavailable(e.to_string())),
        }
    }

    /// Writes a sibling temp file, then renames it over the store. A crash
    /// mid-write leaves the previous contents in place.
    async fn write_map(&self, map: &Map<String, Value>) -> PortResult<()> {
        let bytes =
            serde_json::to_vec_pretty(map).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let staging = staging_path(&self.path);
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> PortResult<Option<AuthToken>> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await?;
        Ok(map
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(AuthToken::new))
    }

    async fn save(&self, token: &AuthToken) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.as_str().to_string()));
        self.write_map(&map).await?;
        debug!("Token persisted to {}.", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(TOKEN_KEY).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_means_no_token() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("storage.json"));
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn token_survives_a_new_store_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");

        FileTokenStore::new(&path)
            .save(&AuthToken::new("jwt-1"))
            .await
            .unwrap();
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.load().await.unwrap(), Some(AuthToken::new("jwt-1")));

        reopened.save(&AuthToken::new("jwt-2")).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), Some(AuthToken::new("jwt-2")));
    }

    #[tokio::test]
    async fn clear_keeps_unrelated_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme": "dark", "supabaseToken": "jwt"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().await.unwrap(), Some(AuthToken::new("jwt")));
        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"theme": "dark"}));
    }

    #[tokio::test]
    async fn interrupted_write_keeps_the_previous_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let store = FileTokenStore::new(&path);
        store.save(&AuthToken::new("jwt-1")).await.unwrap();
        assert!(!staging_path(&path).exists());

        // A half-written staging file from a crashed save.
        std::fs::write(staging_path(&path), "{\"supabaseTok").unwrap();
        assert_eq!(store.load().await.unwrap(), Some(AuthToken::new("jwt-1")));

        store.save(&AuthToken::new("jwt-2")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(AuthToken::new("jwt-2")));
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn staging_file_sits_next_to_the_store() {
        let path = Path::new("/var/lib/scribe/storage.json");
        assert_eq!(staging_path(path), Path::new("/var/lib/scribe/storage.json.tmp"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileTokenStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
