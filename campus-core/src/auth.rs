//! Roles, the logged-in session and its on-disk store.

use crate::api::PortalBackend;
use crate::error::SessionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Etudiant,
    Enseignant,
    Admin,
    Direction,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Etudiant, Role::Enseignant, Role::Admin, Role::Direction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Etudiant => "ETUDIANT",
            Role::Enseignant => "ENSEIGNANT",
            Role::Admin => "ADMIN",
            Role::Direction => "DIRECTION",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Etudiant => "Student",
            Role::Enseignant => "Teacher",
            Role::Admin => "Administrator",
            Role::Direction => "Direction",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ETUDIANT" | "STUDENT" => Ok(Role::Etudiant),
            "ENSEIGNANT" | "TEACHER" => Ok(Role::Enseignant),
            "ADMIN" => Ok(Role::Admin),
            "DIRECTION" => Ok(Role::Direction),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access: String,
    pub refresh: String,
    pub role: Role,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub access: String,
    pub refresh: String,
    pub logged_in_at: DateTime<Utc>,
}

impl From<Credentials> for Session {
    fn from(c: Credentials) -> Self {
        Self {
            username: c.username,
            role: c.role,
            access: c.access,
            refresh: c.refresh,
            logged_in_at: Utc::now(),
        }
    }
}

/// JSON file holding the current session between runs.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing is stored.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Explicit auth state: initialized from the store, replaced by login,
/// torn down by logout.
#[derive(Debug)]
pub struct AuthContext {
    store: SessionStore,
    session: Option<Session>,
}

impl AuthContext {
    /// A store that cannot be read counts as logged out.
    pub fn init(store: SessionStore) -> Self {
        let session = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring stored session at {}: {}", store.path().display(), e);
                None
            }
        };
        if let Some(s) = &session {
            info!("🔑 Restored session for {} ({})", s.username, s.role);
        }
        Self { store, session }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.session.as_ref().map(|s| s.role)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub async fn login<B>(&mut self, backend: &B, email: &str, password: &str) -> Result<&Session, SessionError>
    where
        B: PortalBackend + ?Sized,
    {
        let credentials = backend.login(email, password).await?;
        let session = Session::from(credentials);
        self.store.save(&session)?;
        info!("🔓 Logged in as {} ({})", session.username, session.role);
        Ok(self.session.insert(session))
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(s) = self.session.take() {
            info!("🔒 Logged out {}", s.username);
        }
        self.store.clear()
    }

    /// Swaps the access token using the stored refresh token. A rotated
    /// refresh token replaces the stored one.
    pub async fn refresh<B>(&mut self, backend: &B) -> Result<(), SessionError>
    where
        B: PortalBackend + ?Sized,
    {
        let session = self.session.as_mut().ok_or(SessionError::LoggedOut)?;
        let tokens = backend.refresh_access(&session.refresh).await?;
        session.access = tokens.access;
        if let Some(refresh) = tokens.refresh {
            session.refresh = refresh;
        }
        self.store.save(session)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session() -> Session {
        Session::from(Credentials {
            access: "a".into(),
            refresh: "r".into(),
            role: Role::Admin,
            username: "admin".into(),
        })
    }

    #[test]
    fn roles_use_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Enseignant).unwrap(), "\"ENSEIGNANT\"");
        assert_eq!("teacher".parse::<Role>(), Ok(Role::Enseignant));
        assert_eq!("DIRECTION".parse::<Role>(), Ok(Role::Direction));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn store_round_trips_and_clears() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().unwrap(), None);

        let saved = session();
        store.save(&saved).unwrap();
        assert_eq!(store.load().unwrap(), Some(saved));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_store_starts_logged_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let auth = AuthContext::init(SessionStore::new(&path));
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn logout_clears_the_store() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&session()).unwrap();

        let mut auth = AuthContext::init(store.clone());
        assert_eq!(auth.role(), Some(Role::Admin));
        auth.logout().unwrap();
        assert!(auth.session().is_none());
        assert!(!store.path().exists());
    }
}
