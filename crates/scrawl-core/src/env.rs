// ── Environment capability ──
//
// Everything the session layer needs from its host shell -- current
// location, persisted user storage, navigation -- behind one small trait,
// so the store and guard logic run against a fake in tests and against
// real storage in a shipping client.

use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::warn;

use scrawl_api::AuthUser;

/// A parsed client-side location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Path component, always starting with `/`.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: Option<String>,
    /// Fragment without the leading `#`.
    pub hash: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Location {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            hash: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// The full client-side URL: path + query + hash.
    pub fn full(&self) -> String {
        let mut out = self.path.clone();
        if let Some(ref query) = self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(ref hash) = self.hash {
            out.push('#');
            out.push_str(hash);
        }
        out
    }
}

/// Host-shell capabilities consumed by the session layer.
pub trait Environment: Send + Sync {
    /// The location currently shown by the shell.
    fn location(&self) -> Location;

    /// Read the persisted user. Absence and corruption are both `None` --
    /// the layer fails open to "logged out", never to "logged in".
    fn load_user(&self) -> Option<AuthUser>;

    /// Persist the user for optimistic rendering on the next start.
    fn store_user(&self, user: &AuthUser);

    /// Drop the persisted user.
    fn clear_user(&self);

    /// Ask the shell to navigate to a client-side URL.
    fn navigate(&self, url: &str);
}

// ── In-memory environment (tests, headless tools) ───────────────────

#[derive(Debug, Default)]
struct MemoryState {
    location: Location,
    user: Option<AuthUser>,
    navigations: Vec<String>,
}

/// An environment that keeps everything in memory and records navigations.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    state: Mutex<MemoryState>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(location: Location) -> Self {
        let env = Self::new();
        env.set_location(location);
        env
    }

    pub fn with_user(user: AuthUser) -> Self {
        let env = Self::new();
        env.state.lock().expect("state lock poisoned").user = Some(user);
        env
    }

    pub fn set_location(&self, location: Location) {
        self.state.lock().expect("state lock poisoned").location = location;
    }

    /// Every URL passed to `navigate`, oldest first.
    pub fn navigations(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("state lock poisoned")
            .navigations
            .clone()
    }
}

impl Environment for MemoryEnvironment {
    fn location(&self) -> Location {
        self.state.lock().expect("state lock poisoned").location.clone()
    }

    fn load_user(&self) -> Option<AuthUser> {
        self.state.lock().expect("state lock poisoned").user.clone()
    }

    fn store_user(&self, user: &AuthUser) {
        self.state.lock().expect("state lock poisoned").user = Some(user.clone());
    }

    fn clear_user(&self) {
        self.state.lock().expect("state lock poisoned").user = None;
    }

    fn navigate(&self, url: &str) {
        let mut state = self.state.lock().expect("state lock poisoned");
        state.navigations.push(url.to_owned());
        state.location = Location::new(url.to_owned());
    }
}

// ── Disk-backed environment ─────────────────────────────────────────

/// An environment that persists the user as JSON on disk and publishes
/// navigation requests on a watch channel for the shell to act on.
pub struct DiskEnvironment {
    session_file: PathBuf,
    location: Mutex<Location>,
    nav_tx: watch::Sender<Option<String>>,
}

impl DiskEnvironment {
    pub fn new(session_file: PathBuf) -> Self {
        let (nav_tx, _) = watch::channel(None);
        Self {
            session_file,
            location: Mutex::new(Location::default()),
            nav_tx,
        }
    }

    /// The platform-conventional session file location.
    pub fn default_session_file() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scrawl", "scrawl")
            .map(|dirs| dirs.data_dir().join("session.json"))
    }

    /// Subscribe to navigation requests.
    pub fn navigations(&self) -> watch::Receiver<Option<String>> {
        self.nav_tx.subscribe()
    }

    /// The shell reports location changes back through this.
    pub fn set_location(&self, location: Location) {
        *self.location.lock().expect("location lock poisoned") = location;
    }
}

impl Environment for DiskEnvironment {
    fn location(&self) -> Location {
        self.location.lock().expect("location lock poisoned").clone()
    }

    fn load_user(&self) -> Option<AuthUser> {
        let bytes = std::fs::read(&self.session_file).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "discarding unreadable session file");
                None
            }
        }
    }

    fn store_user(&self, user: &AuthUser) {
        if let Some(parent) = self.session_file.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "failed to create session directory");
                return;
            }
        }
        match serde_json::to_vec_pretty(user) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.session_file, bytes) {
                    warn!(error = %e, "failed to persist session user");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session user"),
        }
    }

    fn clear_user(&self) {
        if let Err(e) = std::fs::remove_file(&self.session_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "failed to remove session file");
            }
        }
    }

    fn navigate(&self, url: &str) {
        *self.location.lock().expect("location lock poisoned") = Location::new(url.to_owned());
        let _ = self.nav_tx.send(Some(url.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_concatenates_query_and_hash() {
        let loc = Location::new("/notes").with_query("page=2").with_hash("top");
        assert_eq!(loc.full(), "/notes?page=2#top");
        assert_eq!(Location::new("/notes").full(), "/notes");
    }

    #[test]
    fn disk_environment_round_trips_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = DiskEnvironment::new(dir.path().join("session.json"));

        assert_eq!(env.load_user(), None);

        let user = AuthUser {
            username: "alice".into(),
            email: Some("alice@example.com".into()),
            authorities: vec!["ROLE_USER".into()],
        };
        env.store_user(&user);
        assert_eq!(env.load_user(), Some(user));

        env.clear_user();
        assert_eq!(env.load_user(), None);
        // Clearing twice is fine.
        env.clear_user();
    }

    #[test]
    fn corrupt_session_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("session.json");
        std::fs::write(&file, b"{not json").expect("write");

        let env = DiskEnvironment::new(file);
        assert_eq!(env.load_user(), None);
    }
}
