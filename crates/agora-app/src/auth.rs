//! Username login and session persistence.
//!
//! There is no password or remote auth: signing in means resolving (or
//! creating) a user by normalized username and remembering their id in a
//! single-row `local_session` table, so the session survives restarts.

use rusqlite::{params, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use agora_store::users::normalize_username;
use agora_store::{StoreError, User};

use crate::app::App;
use crate::error::{AppError, Result};

impl App {
    /// Sign in by username, creating the user on first login.
    ///
    /// The username is normalized (trim + lowercase) first; a freshly created
    /// user gets a capitalized form of it as display name. The session is
    /// persisted so [`App::restore_session`] can pick it up after a restart.
    pub fn login(&mut self, username: &str) -> Result<User> {
        let normalized = normalize_username(username);
        if normalized.is_empty() {
            return Err(AppError::InvalidUsername);
        }

        let user = match self.db.get_user_by_username(&normalized) {
            Ok(existing) => existing,
            Err(StoreError::NotFound) => {
                let fresh = User::new(&normalized, &capitalize_words(&normalized));
                self.db.create_user(&fresh)?
            }
            Err(e) => return Err(e.into()),
        };

        self.save_session(user.id)?;
        info!(username = %user.username, user = %user.id, "signed in");

        self.current_user = Some(user.clone());
        Ok(user)
    }

    /// Restore the previously signed-in user, if the session row still
    /// points at an existing user. Quietly returns `None` otherwise.
    pub fn restore_session(&mut self) -> Result<Option<User>> {
        self.ensure_session_table()?;

        let stored: Option<String> = self
            .db
            .conn()
            .query_row("SELECT user_id FROM local_session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StoreError::from)?;

        let id_str = match stored {
            Some(s) => s,
            None => return Ok(None),
        };

        let user_id = Uuid::parse_str(&id_str).map_err(StoreError::from)?;
        match self.db.get_user(user_id) {
            Ok(user) => {
                info!(username = %user.username, "session restored");
                self.current_user = Some(user.clone());
                Ok(Some(user))
            }
            Err(StoreError::NotFound) => {
                // Stale session: the user row is gone.
                self.clear_session()?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sign out, forgetting the persisted session.
    pub fn logout(&mut self) -> Result<()> {
        self.clear_session()?;
        if let Some(ref user) = self.current_user {
            info!(username = %user.username, "signed out");
        }
        self.current_user = None;
        Ok(())
    }

    /// Write profile changes through to the store.
    ///
    /// When the updated user is the signed-in one, the in-memory session is
    /// refreshed so callers observe the new profile immediately.
    pub fn update_profile(&mut self, user: &User) -> Result<User> {
        let updated = self.db.update_user(user)?;

        if let Some(ref current) = self.current_user {
            if current.id == updated.id {
                self.current_user = Some(updated.clone());
            }
        }

        Ok(updated)
    }

    fn save_session(&self, user_id: Uuid) -> Result<()> {
        self.ensure_session_table()?;
        self.db
            .conn()
            .execute(
                "INSERT OR REPLACE INTO local_session (id, user_id) VALUES (1, ?1)",
                params![user_id.to_string()],
            )
            .map_err(StoreError::from)?;
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        self.ensure_session_table()?;
        self.db
            .conn()
            .execute("DELETE FROM local_session WHERE id = 1", [])
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// The session table is owned by the app crate, not the store schema,
    /// so it is created lazily here rather than in a migration.
    fn ensure_session_table(&self) -> Result<()> {
        self.db
            .conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS local_session (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    user_id TEXT NOT NULL
                );",
            )
            .map_err(StoreError::from)?;
        Ok(())
    }
}

/// Uppercase the first letter of each whitespace-separated word.
fn capitalize_words(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_creates_user_with_capitalized_display_name() {
        let mut app = App::open_in_memory().expect("should open");

        let user = app.login("  Maya  ").expect("should sign in");
        assert_eq!(user.username, "maya");
        assert_eq!(user.display_name, "Maya");
        assert_eq!(app.current_user().map(|u| u.id), Some(user.id));

        let stored = app
            .store()
            .get_user_by_username("maya")
            .expect("user should be persisted");
        assert_eq!(stored.id, user.id);
    }

    #[test]
    fn login_is_case_insensitive_across_sessions() {
        let mut app = App::open_in_memory().expect("should open");

        let first = app.login("sam").expect("should sign in");
        app.logout().expect("should sign out");
        let second = app.login(" SAM ").expect("should sign in again");

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn login_with_blank_username_is_invalid() {
        let mut app = App::open_in_memory().expect("should open");

        assert!(matches!(app.login("   "), Err(AppError::InvalidUsername)));
        assert!(app.current_user().is_none());
    }

    #[test]
    fn session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        let user_id = {
            let mut app = App::open_at(&path).expect("should open");
            app.login("ada").expect("should sign in").id
        };

        let mut app = App::open_at(&path).expect("should reopen");
        assert!(app.current_user().is_none());

        let restored = app.restore_session().expect("should restore");
        assert_eq!(restored.map(|u| u.id), Some(user_id));
        assert_eq!(app.require_user().expect("signed in").username, "ada");
    }

    #[test]
    fn logout_forgets_the_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        {
            let mut app = App::open_at(&path).expect("should open");
            app.login("kit").expect("should sign in");
            app.logout().expect("should sign out");
            assert!(app.current_user().is_none());
        }

        let mut app = App::open_at(&path).expect("should reopen");
        let restored = app.restore_session().expect("should restore");
        assert!(restored.is_none());
    }

    #[test]
    fn restore_with_no_session_is_quiet() {
        let mut app = App::open_in_memory().expect("should open");
        assert!(app.restore_session().expect("should succeed").is_none());
    }

    #[test]
    fn restore_with_deleted_user_clears_the_stale_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        {
            let mut app = App::open_at(&path).expect("should open");
            app.login("ghost").expect("should sign in");
            // Remove the user row out from under the session.
            app.store()
                .conn()
                .execute("DELETE FROM users WHERE username = 'ghost'", [])
                .expect("should delete user");
        }

        let mut app = App::open_at(&path).expect("should reopen");
        assert!(app.restore_session().expect("should succeed").is_none());
        // A second restore finds no session row at all.
        assert!(app.restore_session().expect("should succeed").is_none());
    }

    #[test]
    fn update_profile_refreshes_the_signed_in_user() {
        let mut app = App::open_in_memory().expect("should open");

        let mut user = app.login("remy").expect("should sign in");
        user.bio = Some("says hi".to_string());
        user.interests = vec!["music".to_string()];

        let updated = app.update_profile(&user).expect("should update");
        assert_eq!(updated.bio.as_deref(), Some("says hi"));

        let current = app.require_user().expect("still signed in");
        assert_eq!(current.bio.as_deref(), Some("says hi"));
        assert_eq!(current.interests, vec!["music".to_string()]);
    }

    #[test]
    fn update_profile_for_another_user_leaves_the_session_alone() {
        let mut app = App::open_in_memory().expect("should open");

        app.login("lea").expect("should sign in");
        let mut other = app
            .store()
            .create_user(&User::new("noor", "Noor"))
            .expect("should create");

        other.bio = Some("travels".to_string());
        app.update_profile(&other).expect("should update");

        assert_eq!(app.require_user().expect("signed in").username, "lea");
        assert!(app.require_user().expect("signed in").bio.is_none());
    }

    #[test]
    fn capitalize_words_handles_multiword_names() {
        assert_eq!(capitalize_words("maya"), "Maya");
        assert_eq!(capitalize_words("jean luc"), "Jean Luc");
        assert_eq!(capitalize_words(""), "");
    }
}
