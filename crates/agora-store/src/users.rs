//! CRUD operations for [`User`] records (the user directory).
//!
//! Usernames are unique case-insensitively.  Every write and lookup funnels
//! through [`normalize_username`]; the `UNIQUE` column constraint only backs
//! up the check the directory performs itself.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

/// Normalize a username for storage and lookup: trim surrounding whitespace,
/// fold to lowercase.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user and return the stored (normalized) record.
    ///
    /// Fails with [`StoreError::InvalidInput`] when the username is empty
    /// after normalization, and with [`StoreError::DuplicateUsername`] when a
    /// case-insensitive match already exists.
    pub fn create_user(&self, user: &User) -> Result<User> {
        let username = normalize_username(&user.username);
        if username.is_empty() {
            return Err(StoreError::InvalidInput(
                "username is empty after normalization".to_string(),
            ));
        }
        if self.username_taken(&username, None)? {
            return Err(StoreError::DuplicateUsername(username));
        }

        let stored = User {
            username,
            ..user.clone()
        };

        self.conn().execute(
            "INSERT INTO users (id, username, display_name, email, avatar_url, bio, interests, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id.to_string(),
                stored.username,
                stored.display_name,
                stored.email,
                stored.avatar_url,
                stored.bio,
                serde_json::to_string(&stored.interests)?,
                stored.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!(user = %stored.id, username = %stored.username, "created user");
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, display_name, email, avatar_url, bio, interests, created_at
                 FROM users
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a single user by username (case-insensitive exact match).
    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        let username = normalize_username(username);
        self.conn()
            .query_row(
                "SELECT id, username, display_name, email, avatar_url, bio, interests, created_at
                 FROM users
                 WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all users, newest account first.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, username, display_name, email, avatar_url, bio, interests, created_at
             FROM users
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update a user's profile fields.  `created_at` is immutable.
    ///
    /// Fails with [`StoreError::NotFound`] when the id is unknown and with
    /// [`StoreError::DuplicateUsername`] when the (normalized) username
    /// belongs to a different user.
    pub fn update_user(&self, user: &User) -> Result<User> {
        let username = normalize_username(&user.username);
        if username.is_empty() {
            return Err(StoreError::InvalidInput(
                "username is empty after normalization".to_string(),
            ));
        }
        if self.username_taken(&username, Some(user.id))? {
            return Err(StoreError::DuplicateUsername(username));
        }

        let affected = self.conn().execute(
            "UPDATE users
             SET username = ?1, display_name = ?2, email = ?3, avatar_url = ?4, bio = ?5, interests = ?6
             WHERE id = ?7",
            params![
                username,
                user.display_name,
                user.email,
                user.avatar_url,
                user.bio,
                serde_json::to_string(&user.interests)?,
                user.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(User {
            username,
            ..user.clone()
        })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Existence probe used by the referential guards in the other stores.
    pub(crate) fn user_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Whether a normalized username is already held by a user other than
    /// `exclude`.
    fn username_taken(&self, username: &str, exclude: Option<Uuid>) -> Result<bool> {
        let taken: bool = match exclude {
            Some(id) => self.conn().query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
                params![username, id.to_string()],
                |row| row.get(0),
            )?,
            None => self.conn().query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
                params![username],
                |row| row.get(0),
            )?,
        };
        Ok(taken)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].  Shared with the membership queries
/// in the community store.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let display_name: String = row.get(2)?;
    let email: String = row.get(3)?;
    let avatar_url: Option<String> = row.get(4)?;
    let bio: Option<String> = row.get(5)?;
    let interests_json: String = row.get(6)?;
    let created_str: String = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let interests: Vec<String> = serde_json::from_str(&interests_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id,
        username,
        display_name,
        email,
        avatar_url,
        bio,
        interests,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db() -> Database {
        Database::open_in_memory().expect("should open")
    }

    #[test]
    fn create_normalizes_username() {
        let db = open_db();

        let created = db
            .create_user(&User::new("  NovaRider  ", "Nova"))
            .expect("should create");
        assert_eq!(created.username, "novarider");

        let by_exact = db
            .get_user_by_username("novarider")
            .expect("lookup should succeed");
        let by_shouty = db
            .get_user_by_username("NOVARIDER")
            .expect("lookup should succeed");
        let by_padded = db
            .get_user_by_username("  NovaRider ")
            .expect("lookup should succeed");
        assert_eq!(by_exact.id, created.id);
        assert_eq!(by_shouty.id, created.id);
        assert_eq!(by_padded.id, created.id);
    }

    #[test]
    fn duplicate_username_rejected_case_insensitively() {
        let db = open_db();
        db.create_user(&User::new("ada", "Ada")).expect("should create");

        let err = db.create_user(&User::new(" ADA ", "Other Ada")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(name) if name == "ada"));
    }

    #[test]
    fn empty_username_is_invalid() {
        let db = open_db();
        let err = db.create_user(&User::new("   ", "Blank")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = open_db();
        assert!(matches!(db.get_user(Uuid::new_v4()), Err(StoreError::NotFound)));
        assert!(matches!(
            db.get_user_by_username("ghost"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn list_users_newest_first() {
        let db = open_db();

        let mut early = User::new("early", "Early Bird");
        early.created_at = Utc::now() - chrono::Duration::minutes(5);
        db.create_user(&early).expect("should create");
        db.create_user(&User::new("late", "Late Riser"))
            .expect("should create");

        let users = db.list_users().expect("should list");
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "late");
        assert_eq!(users[1].username, "early");
    }

    #[test]
    fn update_round_trips_profile_fields() {
        let db = open_db();
        let mut user = db.create_user(&User::new("kai", "Kai")).expect("should create");

        user.bio = Some("hello there".to_string());
        user.avatar_url = Some("avatar://kai".to_string());
        user.interests = vec!["Technology".to_string(), "Music".to_string()];
        db.update_user(&user).expect("should update");

        let fetched = db.get_user(user.id).expect("should fetch");
        assert_eq!(fetched.bio.as_deref(), Some("hello there"));
        assert_eq!(fetched.avatar_url.as_deref(), Some("avatar://kai"));
        assert_eq!(fetched.interests, user.interests);
        assert_eq!(fetched.created_at, user.created_at);
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let db = open_db();
        let err = db.update_user(&User::new("nobody", "No One")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn update_cannot_take_anothers_username() {
        let db = open_db();
        db.create_user(&User::new("first", "First")).expect("should create");
        let mut second = db.create_user(&User::new("second", "Second")).expect("should create");

        second.username = "First".to_string();
        let err = db.update_user(&second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername(_)));

        // renaming to your own name stays legal
        let mut first = db.get_user_by_username("first").expect("should fetch");
        first.display_name = "First Again".to_string();
        db.update_user(&first).expect("should update");
    }
}
