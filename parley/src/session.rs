//! Login state and its persistence between runs.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::{fs, io};

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write session file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize session: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted form of a session.
///
/// Older session files only contain the token, so the username is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Where credentials are kept between runs.
#[derive(Debug, Clone)]
pub enum CredentialStore {
    File(PathBuf),
    /// Nothing survives the process.
    Memory,
}

impl CredentialStore {
    fn load(&self) -> Option<Credentials> {
        let Self::File(path) = self else {
            return None;
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                debug!("no session loaded from {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&content) {
            Ok(credentials) if !credentials.token.is_empty() => Some(credentials),
            Ok(_) => {
                debug!("ignoring session without token");
                None
            }
            Err(err) => {
                debug!("ignoring unparseable session: {err}");
                None
            }
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<(), Error> {
        if let Self::File(path) = self {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string(credentials)?)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        if let Self::File(path) = self {
            match fs::remove_file(path) {
                Err(err) if err.kind() != ErrorKind::NotFound => return Err(err.into()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Gatekeeper for the main view.
#[derive(Debug)]
pub struct Auth {
    store: CredentialStore,
    credentials: Option<Credentials>,
}

impl Auth {
    /// Restore the session from the store. Anything that goes wrong simply
    /// results in being logged out.
    pub fn hydrate(store: CredentialStore) -> Self {
        let credentials = store.load();
        Self { store, credentials }
    }

    pub fn logged_in(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| &c.token as &str)
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref()?.username.as_deref()
    }

    pub fn log_in(&mut self, credentials: Credentials) -> Result<(), Error> {
        self.store.save(&credentials)?;
        self.credentials = Some(credentials);
        Ok(())
    }

    /// The in-memory session is always dropped, even if the persisted one
    /// could not be removed.
    pub fn log_out(&mut self) -> Result<(), Error> {
        self.credentials = None;
        self.store.clear()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{Auth, CredentialStore, Credentials};

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parley-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn credentials() -> Credentials {
        Credentials {
            token: "eyJhbGciOiJIUzI1NiJ9".to_string(),
            username: Some("admin".to_string()),
        }
    }

    #[test]
    fn missing_file_is_logged_out() {
        let auth = Auth::hydrate(CredentialStore::File(temp_path("missing.json")));
        assert!(!auth.logged_in());
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn garbage_is_logged_out() {
        let path = temp_path("garbage.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(!Auth::hydrate(CredentialStore::File(path.clone())).logged_in());

        fs::write(&path, r#"{"token":""}"#).unwrap();
        assert!(!Auth::hydrate(CredentialStore::File(path.clone())).logged_in());

        fs::write(&path, "null").unwrap();
        assert!(!Auth::hydrate(CredentialStore::File(path)).logged_in());
    }

    #[test]
    fn token_only_file_hydrates() {
        let path = temp_path("token-only.json");
        fs::write(&path, r#"{"token":"abc"}"#).unwrap();
        let auth = Auth::hydrate(CredentialStore::File(path));
        assert!(auth.logged_in());
        assert_eq!(auth.token(), Some("abc"));
        assert_eq!(auth.username(), None);
    }

    #[test]
    fn log_in_persists_and_log_out_clears() {
        let path = temp_path("roundtrip.json");
        let store = CredentialStore::File(path.clone());

        let mut auth = Auth::hydrate(store.clone());
        auth.log_in(credentials()).unwrap();
        assert!(auth.logged_in());
        assert_eq!(auth.username(), Some("admin"));

        let rehydrated = Auth::hydrate(store.clone());
        assert_eq!(rehydrated.token(), Some("eyJhbGciOiJIUzI1NiJ9"));

        auth.log_out().unwrap();
        assert!(!auth.logged_in());
        assert!(!path.exists());
        assert!(!Auth::hydrate(store).logged_in());

        // Logging out twice is fine
        auth.log_out().unwrap();
    }

    #[test]
    fn memory_store_forgets() {
        let mut auth = Auth::hydrate(CredentialStore::Memory);
        auth.log_in(credentials()).unwrap();
        assert!(auth.logged_in());
        assert!(!Auth::hydrate(CredentialStore::Memory).logged_in());
    }
}
