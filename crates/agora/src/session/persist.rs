//! On-disk form of the login session.
//!
//! The file keeps the flat three-field shape (`is_logged_in`, `session_id`,
//! `user_id`) so it stays readable by hand. Writes go to a temp file that is
//! renamed over the target.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::Session;
use super::error::{Result, SessionError};
use crate::api::UserId;

/// Directory under `$HOME` holding client state.
pub const DEFAULT_STATE_DIR: &str = ".agora";

/// File name of the persisted session.
pub const SESSION_FILE: &str = "session.json";

/// Flat persisted session record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        match session {
            Session::LoggedOut => Self::default(),
            Session::LoggedIn {
                session_id,
                user_id,
            } => Self {
                is_logged_in: true,
                session_id: Some(session_id.clone()),
                user_id: Some(*user_id),
            },
        }
    }
}

impl PersistedSession {
    /// Convert to a session, or `None` when the record breaks the
    /// logged-in iff session-id invariant.
    pub fn into_session(self) -> Option<Session> {
        match (self.is_logged_in, self.session_id, self.user_id) {
            (false, None, None) => Some(Session::LoggedOut),
            (true, Some(session_id), Some(user_id)) if !session_id.is_empty() => {
                Some(Session::LoggedIn {
                    session_id,
                    user_id,
                })
            }
            _ => None,
        }
    }
}

/// Default path of the session file: `~/.agora/session.json`.
pub fn default_path() -> PathBuf {
    let home = match std::env::var("HOME") {
        Ok(h) => h,
        Err(_) => {
            tracing::warn!("HOME not set, using /tmp for the session file");
            "/tmp".to_string()
        }
    };
    PathBuf::from(home).join(DEFAULT_STATE_DIR).join(SESSION_FILE)
}

/// Load the persisted session. Returns `None` if the file does not exist.
pub fn load(path: &Path) -> Result<Option<PersistedSession>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SessionError::io(path, e)),
    };
    let record = serde_json::from_str(&contents).map_err(|e| SessionError::json(path, e))?;
    Ok(Some(record))
}

/// Save the session with owner-only permissions.
pub fn save(path: &Path, record: &PersistedSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
    }

    let contents = serde_json::to_string_pretty(record).map_err(|e| SessionError::json(path, e))?;
    let temp_path = path.with_extension("json.tmp");

    let file = open_private(&temp_path).map_err(|e| SessionError::io(&temp_path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .map_err(|e| SessionError::io(&temp_path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| SessionError::io(&temp_path, e.into_error()))?;
    file.sync_all()
        .map_err(|e| SessionError::io(&temp_path, e))?;

    std::fs::rename(&temp_path, path).map_err(|e| SessionError::io(path, e))?;
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
