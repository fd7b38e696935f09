//! Session store.
//!
//! Holds the bearer credential and the authenticated identity, and persists
//! the credential through a [`CredentialStore`] so a session survives process
//! restarts.
//!
//! The store is owned explicitly and shared as `Arc<SessionStore>`. Callers
//! read the current [`SessionState`] with [`SessionStore::state`] or follow it
//! with [`SessionStore::subscribe`]; only `login`, `logout`, `expire` and
//! `restore_session` change it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use library_ai_core::{CREDENTIAL_STORAGE_KEY, Credential, Identity};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::AuthApi;

// =============================================================================
// Credential storage
// =============================================================================

/// Durable storage for the single bearer credential.
pub trait CredentialStore: Send + Sync {
    /// Read the persisted credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage cannot be read.
    fn load(&self) -> io::Result<Option<Credential>>;

    /// Persist `credential`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage cannot be written.
    fn save(&self, credential: &Credential) -> io::Result<()>;

    /// Remove the persisted credential. Removing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the storage cannot be modified.
    fn clear(&self) -> io::Result<()>;
}

/// Stores the credential in a file named `accessToken` inside a directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store the credential under `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIAL_STORAGE_KEY),
        }
    }

    /// Path of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> io::Result<Option<Credential>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let credential = Credential::new(contents);
                Ok((!credential.is_empty()).then_some(credential))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, credential: &Credential) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, credential.expose())
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    std::fs::write(path, contents)
}

/// Keeps the credential in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated with `credential`, as if a previous process had logged in.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            token: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> io::Result<Option<Credential>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &Credential) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// Session state
// =============================================================================

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A persisted credential is being checked against the server.
    Restoring,
    /// No session.
    Anonymous,
    /// Logged in.
    Authenticated(Identity),
}

impl SessionState {
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Restoring | Self::Anonymous => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn is_restoring(&self) -> bool {
        matches!(self, Self::Restoring)
    }
}

/// Owner of the bearer credential and the authenticated identity.
///
/// Starts in [`SessionState::Restoring`]; call
/// [`restore_session`](Self::restore_session) once at startup.
pub struct SessionStore {
    storage: Arc<dyn CredentialStore>,
    credential: RwLock<Option<Credential>>,
    state: watch::Sender<SessionState>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Restoring);
        Self {
            storage,
            credential: RwLock::new(None),
            state,
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Follow state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns `true` iff an identity is set.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// The live credential, if any.
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Start a session.
    ///
    /// The session takes effect even if the credential cannot be persisted;
    /// it will then not survive a restart.
    #[instrument(skip(self, credential, identity), fields(user_id = %identity.id))]
    pub async fn login(&self, credential: Credential, identity: Identity) {
        if let Err(e) = self.storage.save(&credential) {
            warn!(error = %e, "Failed to persist credential");
        }
        *self.credential.write().await = Some(credential);
        self.state.send_replace(SessionState::Authenticated(identity));
        info!("Session started");
    }

    /// End the session. Safe to call in any state.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.end().await;
        info!("Logged out");
    }

    /// End the session because the server rejected `rejected`.
    ///
    /// Does nothing if the live credential is no longer `rejected`, so a late
    /// 401 for an old credential cannot end a newer session. Returns `true`
    /// when the session was ended.
    pub async fn expire(&self, rejected: &Credential) -> bool {
        {
            let current = self.credential.read().await;
            if current.as_ref() != Some(rejected) {
                debug!("Ignoring 401 for a credential that is no longer live");
                return false;
            }
        }
        self.end().await;
        info!("Session expired");
        true
    }

    async fn end(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted credential");
        }
        *self.credential.write().await = None;
        self.state.send_replace(SessionState::Anonymous);
    }

    /// Re-establish a persisted session at startup.
    ///
    /// Resolves the stored credential through `GET /auth/me`. Any failure
    /// clears the credential and leaves the session anonymous.
    #[instrument(skip(self, auth))]
    pub async fn restore_session(&self, auth: &AuthApi) {
        self.state.send_replace(SessionState::Restoring);

        let stored = match self.storage.load() {
            Ok(Some(credential)) if !credential.is_empty() => credential,
            Ok(_) => {
                debug!("No persisted credential");
                self.state.send_replace(SessionState::Anonymous);
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                self.state.send_replace(SessionState::Anonymous);
                return;
            }
        };

        *self.credential.write().await = Some(stored.clone());

        match auth.me().await {
            Ok(identity) => {
                if self.credential.read().await.as_ref() == Some(&stored) {
                    info!(user_id = %identity.id, "Session restored");
                    self.state.send_replace(SessionState::Authenticated(identity));
                }
            }
            Err(e) => {
                info!(error = %e, "Persisted credential rejected");
                if self.credential.read().await.as_ref() == Some(&stored) {
                    self.end().await;
                }
            }
        }
    }
}
