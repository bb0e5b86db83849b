use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConfigLocator;

use super::{AuthError, Session};

const SESSION_FORMAT: u32 = 1;

/// Where the signed-in session lives between runs, keyed by profile.
pub trait CredentialStore {
    fn load(&self, profile: &str) -> Result<Option<Session>, AuthError>;
    fn save(&self, profile: &str, session: &Session) -> Result<(), AuthError>;
    fn delete(&self, profile: &str) -> Result<(), AuthError>;
}

/// One `session-<profile>.json` per profile under the tripnote config directory.
///
/// Saves go through a sibling temp file and a rename, so a reader sees either the
/// previous session or the new one, never a partial write. On unix the file is
/// created owner-only because it holds the refresh token.
pub struct FileCredentialStore {
    locator: ConfigLocator,
}

impl FileCredentialStore {
    pub fn new(locator: ConfigLocator) -> Self {
        Self { locator }
    }

    pub fn with_default_locator() -> Result<Self, AuthError> {
        Ok(Self::new(ConfigLocator::new()?))
    }

    fn replace_file(path: &Path, payload: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staged = staging_path(path);
        let result = open_private(&staged)
            .and_then(|mut file| {
                file.write_all(payload)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&staged, path));
        if result.is_err() {
            let _ = fs::remove_file(&staged);
        }
        result
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, profile: &str) -> Result<Option<Session>, AuthError> {
        let path = self.locator.session_file(profile);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let stored: StoredSession = serde_json::from_str(&raw)?;
        if stored.format != SESSION_FORMAT {
            warn!(
                profile,
                format = stored.format,
                "stored session has an unknown format, treating profile as signed out"
            );
            return Ok(None);
        }
        Ok(Some(stored.session))
    }

    fn save(&self, profile: &str, session: &Session) -> Result<(), AuthError> {
        let path = self.locator.session_file(profile);
        let stored = StoredSession {
            format: SESSION_FORMAT,
            profile: profile.to_owned(),
            session: session.clone(),
        };
        let payload = serde_json::to_vec_pretty(&stored)?;
        Self::replace_file(&path, &payload)?;
        debug!(profile, path = %path.display(), "session saved");
        Ok(())
    }

    fn delete(&self, profile: &str) -> Result<(), AuthError> {
        match fs::remove_file(self.locator.session_file(profile)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "version")]
    format: u32,
    profile: String,
    session: Session,
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // A leftover temp file keeps its old mode; tighten it either way.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn sample_session(access: &str) -> Session {
        Session::new(
            User {
                id: "user-1".into(),
                email: Some("ada@example.com".into()),
            },
            access.into(),
            "refresh".into(),
            Some(Utc::now() + Duration::minutes(5)),
        )
    }

    fn store(temp_dir: &TempDir) -> FileCredentialStore {
        FileCredentialStore::new(ConfigLocator::from_root(temp_dir.path().to_path_buf()).unwrap())
    }

    #[test]
    fn session_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let session = sample_session("token");
        store(&temp_dir).save("default", &session).unwrap();

        let loaded = store(&temp_dir).load("default").unwrap().unwrap();
        assert_eq!(loaded.access_token, session.access_token);
        assert_eq!(loaded.refresh_token, session.refresh_token);
        assert_eq!(loaded.user, session.user);
    }

    #[test]
    fn overwrite_replaces_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("default", &sample_session("first")).unwrap();
        store.save("default", &sample_session("second")).unwrap();

        let loaded = store.load("default").unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");

        let path = store.locator.session_file("default");
        assert!(!staging_path(&path).exists());
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("session-default.json")]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn unknown_format_reads_as_signed_out() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let stored = StoredSession {
            format: SESSION_FORMAT + 1,
            profile: "default".into(),
            session: sample_session("token"),
        };
        fs::write(
            store.locator.session_file("default"),
            serde_json::to_vec(&stored).unwrap(),
        )
        .unwrap();
        assert!(store.load("default").unwrap().is_none());
    }

    #[test]
    fn profiles_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store.save("work", &sample_session("token")).unwrap();
        assert!(store.load("default").unwrap().is_none());
        store.delete("work").unwrap();
        assert!(store.load("work").unwrap().is_none());
    }

    #[test]
    fn delete_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        store(&temp_dir).delete("missing").unwrap();
    }
}
