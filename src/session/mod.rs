//! Login token bookkeeping.
//!
//! A token lives in one of two scopes: the session scope (this login only,
//! also used for guests) or the persistent scope ("remember me"). The session
//! scope is a small JSON file under the runtime directory; the persistent
//! scope is the system keyring.

pub mod keepalive;
pub mod keyring;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Keyring(String),
}

/// Where a freshly issued token is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Session,
    Persistent,
}

impl StorageScope {
    pub fn for_login(remember: bool) -> Self {
        if remember { Self::Persistent } else { Self::Session }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session_token: Option<String>,
    pub persistent_token: Option<String>,
    pub guest: bool,
}

impl SessionState {
    /// Token to send with authenticated requests.
    ///
    /// A guest's session token always wins; otherwise the session scope is
    /// preferred over the persistent one.
    pub fn resolve_token(&self) -> Result<&str, ApiError> {
        let session = self.session_token.as_deref().filter(|t| !t.is_empty());
        let persistent = self.persistent_token.as_deref().filter(|t| !t.is_empty());
        if self.guest {
            if let Some(token) = session {
                return Ok(token);
            }
        }
        session.or(persistent).ok_or(ApiError::Unauthenticated)
    }

    pub fn has_token(&self) -> bool {
        self.resolve_token().is_ok()
    }

    pub fn store_login(&mut self, token: String, scope: StorageScope) {
        match scope {
            StorageScope::Persistent => self.persistent_token = Some(token),
            StorageScope::Session => self.session_token = Some(token),
        }
    }

    /// Guests only ever hold a session-scoped token.
    pub fn store_guest(&mut self, token: String) {
        self.session_token = Some(token);
        self.persistent_token = None;
        self.guest = true;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionScopeFile {
    token: Option<String>,
    #[serde(default)]
    is_guest: bool,
}

/// Reads the session scope. A missing file is an empty scope.
pub fn load_session_scope(path: &Path) -> Result<(Option<String>, bool), SessionError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((None, false)),
        Err(e) => return Err(e.into()),
    };
    let file: SessionScopeFile = serde_json::from_str(&content)?;
    Ok((file.token, file.is_guest))
}

/// Writes the session scope, removing the file when there is nothing to keep.
pub fn save_session_scope(path: &Path, state: &SessionState) -> Result<(), SessionError> {
    if state.session_token.is_none() && !state.guest {
        return match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = SessionScopeFile {
        token: state.session_token.clone(),
        is_guest: state.guest,
    };
    std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

/// Where [`Session::persist`] writes each scope. `None` keeps that scope in memory only.
#[derive(Debug, Clone, Default)]
pub struct Persistence {
    pub session_file: Option<PathBuf>,
    pub keyring_server: Option<String>,
}

/// Shared handle on the current session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    persistence: Persistence,
}

impl Session {
    pub fn new(state: SessionState, persistence: Persistence) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            persistence,
        }
    }

    pub fn in_memory(state: SessionState) -> Self {
        Self::new(state, Persistence::default())
    }

    /// Rebuilds the session from both scopes. An unreadable session file or an
    /// unreachable keyring is logged and treated as an empty scope.
    pub async fn restore(persistence: Persistence) -> Result<Self, SessionError> {
        let mut state = SessionState::default();
        if let Some(path) = &persistence.session_file {
            match load_session_scope(path) {
                Ok((token, guest)) => {
                    state.session_token = token;
                    state.guest = guest;
                }
                Err(e) => {
                    log::warn!("Discarding unreadable session file {}: {}", path.display(), e);
                    if let Err(e) = std::fs::remove_file(path) {
                        log::warn!("Could not remove {}: {}", path.display(), e);
                    }
                }
            }
        }
        if let Some(server) = &persistence.keyring_server {
            match keyring::load_token(server).await {
                Ok(token) => state.persistent_token = token,
                Err(e) => log::warn!("Could not read remembered token: {}", e),
            }
        }
        log::debug!(
            "Session restored (session token: {}, remembered token: {}, guest: {})",
            state.session_token.is_some(),
            state.persistent_token.is_some(),
            state.guest
        );
        Ok(Self::new(state, persistence))
    }

    pub fn snapshot(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn token(&self) -> Result<String, ApiError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.resolve_token().map(str::to_string)
    }

    pub fn is_guest(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).guest
    }

    pub fn update(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    /// Writes both scopes to their backing stores. Failing to clear the keyring
    /// is only logged.
    pub async fn persist(&self) -> Result<(), SessionError> {
        let state = self.snapshot();
        if let Some(path) = &self.persistence.session_file {
            save_session_scope(path, &state)?;
        }
        if let Some(server) = &self.persistence.keyring_server {
            match &state.persistent_token {
                Some(token) => keyring::store_token(server, token).await?,
                None => {
                    if let Err(e) = keyring::delete_token(server).await {
                        log::warn!("Could not forget remembered token: {}", e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Forgets every token and the guest flag, then persists the empty state.
    pub async fn logout_locally(&self) -> Result<(), SessionError> {
        self.update(SessionState::clear);
        self.persist().await
    }
}
