//! CRUD and membership operations for [`Community`] records.
//!
//! `member_count` is a cached aggregate: it changes only inside the same
//! transaction as the membership row that justifies it and is never
//! recomputed on the read path.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Community, CommunityCategory, MemberRole, Membership, User};
use crate::users::row_to_user;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new community together with its creator's owner membership.
    ///
    /// Both rows commit in one transaction and `member_count` is forced to 1
    /// regardless of the caller's struct.  Fails with
    /// [`StoreError::NotFound`] when `creator_id` does not resolve.
    pub fn create_community(&self, community: &Community) -> Result<Community> {
        if !self.user_exists(community.creator_id)? {
            return Err(StoreError::NotFound);
        }

        let stored = Community {
            member_count: 1,
            ..community.clone()
        };
        let membership = Membership::new(stored.creator_id, stored.id, MemberRole::Owner);

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO communities (id, name, description, image_url, category, is_private, creator_id, member_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                stored.id.to_string(),
                stored.name,
                stored.description,
                stored.image_url,
                stored.category.as_str(),
                stored.is_private as i32,
                stored.creator_id.to_string(),
                stored.member_count,
                stored.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "INSERT INTO memberships (id, user_id, community_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                membership.id.to_string(),
                membership.user_id.to_string(),
                membership.community_id.to_string(),
                membership.role.as_str(),
                membership.joined_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(community = %stored.id, creator = %stored.creator_id, "created community");
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single community by UUID.
    pub fn get_community(&self, id: Uuid) -> Result<Community> {
        self.conn()
            .query_row(
                "SELECT id, name, description, image_url, category, is_private, creator_id, member_count, created_at
                 FROM communities
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_community,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all communities, largest first.
    pub fn list_communities(&self) -> Result<Vec<Community>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, image_url, category, is_private, creator_id, member_count, created_at
             FROM communities
             ORDER BY member_count DESC",
        )?;

        let rows = stmt.query_map([], row_to_community)?;

        let mut communities = Vec::new();
        for row in rows {
            communities.push(row?);
        }
        Ok(communities)
    }

    /// List the communities filed under one category, largest first.
    pub fn list_communities_by_category(&self, category: CommunityCategory) -> Result<Vec<Community>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, image_url, category, is_private, creator_id, member_count, created_at
             FROM communities
             WHERE category = ?1
             ORDER BY member_count DESC",
        )?;

        let rows = stmt.query_map(params![category.as_str()], row_to_community)?;

        let mut communities = Vec::new();
        for row in rows {
            communities.push(row?);
        }
        Ok(communities)
    }

    /// Substring search over name or description (case-insensitive for
    /// ASCII, per SQLite `LIKE`), largest community first.
    pub fn search_communities(&self, query: &str) -> Result<Vec<Community>> {
        let pattern = escape_like(query);

        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, image_url, category, is_private, creator_id, member_count, created_at
             FROM communities
             WHERE name LIKE '%' || ?1 || '%' ESCAPE '\\'
                OR description LIKE '%' || ?1 || '%' ESCAPE '\\'
             ORDER BY member_count DESC",
        )?;

        let rows = stmt.query_map(params![pattern], row_to_community)?;

        let mut communities = Vec::new();
        for row in rows {
            communities.push(row?);
        }
        Ok(communities)
    }

    /// List the communities a user belongs to, most recently joined first.
    pub fn list_communities_for_user(&self, user_id: Uuid) -> Result<Vec<Community>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.name, c.description, c.image_url, c.category, c.is_private, c.creator_id, c.member_count, c.created_at
             FROM communities c
             JOIN memberships m ON m.community_id = c.id
             WHERE m.user_id = ?1
             ORDER BY m.joined_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_community)?;

        let mut communities = Vec::new();
        for row in rows {
            communities.push(row?);
        }
        Ok(communities)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update a community's descriptive fields.
    ///
    /// `member_count` and `created_at` are store-maintained and never taken
    /// from the caller; the returned record carries the stored values.
    pub fn update_community(&self, community: &Community) -> Result<Community> {
        let affected = self.conn().execute(
            "UPDATE communities
             SET name = ?1, description = ?2, image_url = ?3, category = ?4, is_private = ?5
             WHERE id = ?6",
            params![
                community.name,
                community.description,
                community.image_url,
                community.category.as_str(),
                community.is_private as i32,
                community.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.get_community(community.id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a community by UUID.  Returns `true` if a row was deleted.
    // ON DELETE CASCADE: memberships, posts + their comments go with it
    pub fn delete_community(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM communities WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Add a user to a community with the plain member role.
    ///
    /// Idempotent: when a membership already exists the call returns
    /// `Ok(false)` and the member count is untouched.  Otherwise the
    /// membership insert and the counter increment commit together and the
    /// call returns `Ok(true)`.  Fails with [`StoreError::NotFound`] when
    /// either id is unknown.
    pub fn join_community(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        if !self.community_exists(community_id)? || !self.user_exists(user_id)? {
            return Err(StoreError::NotFound);
        }

        let membership = Membership::new(user_id, community_id, MemberRole::Member);

        let tx = self.conn().unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO memberships (id, user_id, community_id, role, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                membership.id.to_string(),
                membership.user_id.to_string(),
                membership.community_id.to_string(),
                membership.role.as_str(),
                membership.joined_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            // already a member; dropping the transaction rolls back nothing
            return Ok(false);
        }
        tx.execute(
            "UPDATE communities SET member_count = member_count + 1 WHERE id = ?1",
            params![community_id.to_string()],
        )?;
        tx.commit()?;

        tracing::debug!(community = %community_id, user = %user_id, "user joined community");
        Ok(true)
    }

    /// Remove a user from a community.
    ///
    /// `Ok(false)` no-op when no membership exists.  Otherwise the membership
    /// delete and the counter decrement (floored at 0) commit together.
    /// Fails with [`StoreError::NotFound`] when either id is unknown.
    pub fn leave_community(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        if !self.community_exists(community_id)? || !self.user_exists(user_id)? {
            return Err(StoreError::NotFound);
        }

        let tx = self.conn().unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM memberships WHERE community_id = ?1 AND user_id = ?2",
            params![community_id.to_string(), user_id.to_string()],
        )?;
        if removed == 0 {
            // not a member: no-op, not an error
            return Ok(false);
        }
        tx.execute(
            "UPDATE communities SET member_count = MAX(0, member_count - 1) WHERE id = ?1",
            params![community_id.to_string()],
        )?;
        tx.commit()?;

        tracing::debug!(community = %community_id, user = %user_id, "user left community");
        Ok(true)
    }

    /// Whether a user holds a membership in a community.  Single EXISTS
    /// probe, no row materialization.
    pub fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE community_id = ?1 AND user_id = ?2)",
            params![community_id.to_string(), user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Fetch the membership record for a (community, user) pair.
    pub fn get_membership(&self, community_id: Uuid, user_id: Uuid) -> Result<Membership> {
        self.conn()
            .query_row(
                "SELECT id, user_id, community_id, role, joined_at
                 FROM memberships
                 WHERE community_id = ?1 AND user_id = ?2",
                params![community_id.to_string(), user_id.to_string()],
                row_to_membership,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List a community's members in join order (earliest first).
    pub fn list_members(&self, community_id: Uuid) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.id, u.username, u.display_name, u.email, u.avatar_url, u.bio, u.interests, u.created_at
             FROM users u
             JOIN memberships m ON m.user_id = u.id
             WHERE m.community_id = ?1
             ORDER BY m.joined_at ASC",
        )?;

        let rows = stmt.query_map(params![community_id.to_string()], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Existence probe used by the referential guards in the other stores.
    pub(crate) fn community_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Community`].
fn row_to_community(row: &rusqlite::Row<'_>) -> rusqlite::Result<Community> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: String = row.get(2)?;
    let image_url: Option<String> = row.get(3)?;
    let category_str: String = row.get(4)?;
    let is_private: bool = row.get(5)?;
    let creator_str: String = row.get(6)?;
    let member_count: i64 = row.get(7)?;
    let created_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let category = CommunityCategory::from_str(&category_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let creator_id = Uuid::parse_str(&creator_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Community {
        id,
        name,
        description,
        image_url,
        category,
        is_private,
        creator_id,
        member_count,
        created_at,
    })
}

/// Map a `rusqlite::Row` to a [`Membership`].
fn row_to_membership(row: &rusqlite::Row<'_>) -> rusqlite::Result<Membership> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let community_str: String = row.get(2)?;
    let role_str: String = row.get(3)?;
    let joined_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_id = Uuid::parse_str(&user_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let community_id = Uuid::parse_str(&community_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let role = MemberRole::from_str(&role_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let joined_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&joined_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Membership {
        id,
        user_id,
        community_id,
        role,
        joined_at,
    })
}

/// Escape `%`, `_` and `\` in caller text destined for a LIKE pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
