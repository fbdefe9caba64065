//! Application context shared by the UI-facing operations.
//!
//! The [`App`] struct owns the store handle and the session: which user, if
//! any, is currently signed in. All higher-level operations (auth, feed and
//! conversation hydration, seeding) live in `impl App` blocks split across
//! the sibling modules.

use std::path::Path;

use agora_store::{Database, User};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Central application context.
pub struct App {
    /// Handle to the local SQLite store.
    pub(crate) db: Database,

    /// The signed-in user. `None` until `login` or `restore_session`
    /// succeeds.
    pub(crate) current_user: Option<User>,
}

impl App {
    /// Open the application over the default platform database.
    pub fn open() -> Result<Self> {
        Ok(Self::with_db(Database::new()?))
    }

    /// Open the application over a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::with_db(Database::open_at(path)?))
    }

    /// Open the application over a private in-memory database. Used by tests
    /// and UI previews; nothing is persisted.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::with_db(Database::open_in_memory()?))
    }

    /// Open the application as directed by an [`AppConfig`].
    ///
    /// A configured data directory is created if missing and the database
    /// file placed inside it; otherwise the platform default is used.
    pub fn open_with(config: &AppConfig) -> Result<Self> {
        match config.data_dir {
            Some(ref dir) => {
                std::fs::create_dir_all(dir).map_err(agora_store::StoreError::from)?;
                let db_path = dir.join("agora.db");
                tracing::info!(path = %db_path.display(), "opening configured database");
                Self::open_at(&db_path)
            }
            None => Self::open(),
        }
    }

    fn with_db(db: Database) -> Self {
        Self {
            db,
            current_user: None,
        }
    }

    /// Return the underlying store handle.
    pub fn store(&self) -> &Database {
        &self.db
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// The signed-in user, or [`AppError::NotSignedIn`].
    pub fn require_user(&self) -> Result<&User> {
        self.current_user.as_ref().ok_or(AppError::NotSignedIn)
    }

    /// Populate an empty store with demo data. No-op when any user exists.
    pub fn seed_demo_data(&self) -> Result<crate::seed::SeedStats> {
        Ok(crate::seed::populate_demo_data(&self.db)?)
    }
}
