//! Client-side login session.
//!
//! `SessionStore` is the only process-wide mutable state of the client. It
//! has exactly two transitions, `log_in` and `log_out`; each replaces the
//! whole session, notifies subscribers and persists the result.

mod error;
pub mod persist;

pub use error::{Result, SessionError};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::UserId;
use persist::PersistedSession;

// ============================================================================
// Session
// ============================================================================

/// Authentication state of the client.
///
/// Being logged in and holding a session id are the same fact, so the two
/// cannot disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn {
        session_id: String,
        user_id: UserId,
    },
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Session::LoggedIn { .. })
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Session::LoggedIn { session_id, .. } => Some(session_id),
            Session::LoggedOut => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Session::LoggedIn { user_id, .. } => Some(*user_id),
            Session::LoggedOut => None,
        }
    }
}

// ============================================================================
// Session Store
// ============================================================================

/// Shared handle to the login session.
///
/// Cloning the handle shares the state. Subscribers get a `watch` receiver
/// that always holds the latest session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: watch::Sender<Session>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Create a store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_state(Session::LoggedOut, None)
    }

    /// Open the store backed by the session file at `path`.
    ///
    /// A missing, unreadable or inconsistent file starts the client logged
    /// out; only the latter two are logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match persist::load(&path) {
            Ok(Some(record)) => record.into_session().unwrap_or_else(|| {
                warn!(path = %path.display(), "Inconsistent session file; starting logged out");
                Session::LoggedOut
            }),
            Ok(None) => Session::LoggedOut,
            Err(e) => {
                warn!(error = %e, "Failed to load session; starting logged out");
                Session::LoggedOut
            }
        };
        debug!(path = %path.display(), logged_in = initial.is_logged_in(), "Session loaded");
        Self::with_state(initial, Some(path))
    }

    fn with_state(session: Session, path: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(session);
        Self {
            inner: Arc::new(Inner { state, path }),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Current session id, read at call time.
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.borrow().session_id().map(str::to_string)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.inner.state.borrow().user_id()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.borrow().is_logged_in()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Transition to logged in with the given credential.
    pub fn log_in(&self, session_id: impl Into<String>, user_id: UserId) {
        info!(user_id, "Logged in");
        self.replace(Session::LoggedIn {
            session_id: session_id.into(),
            user_id,
        });
    }

    /// Transition to logged out.
    pub fn log_out(&self) {
        if self.is_logged_in() {
            info!("Logged out");
        }
        self.replace(Session::LoggedOut);
    }

    fn replace(&self, next: Session) {
        let record = PersistedSession::from(&next);
        self.inner.state.send_replace(next);

        if let Some(path) = &self.inner.path
            && let Err(e) = persist::save(path, &record)
        {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("logged_in", &self.is_logged_in())
            .field("path", &self.inner.path)
            .finish()
    }
}
