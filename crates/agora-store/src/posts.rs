//! CRUD operations for [`Post`] and [`Comment`] records, the like/comment
//! counters, and home-feed composition.
//!
//! `like_count` and `comment_count` are cached aggregates: comment writes
//! adjust the counter in the same transaction, likes are a bare counter bump
//! with no per-user ledger.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Comment, Post};

/// Maximum number of posts returned by [`Database::list_home_feed`].
pub const HOME_FEED_LIMIT: u32 = 50;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new post with both counters forced to zero.
    ///
    /// Fails with [`StoreError::NotFound`] when the author or the community
    /// does not resolve.
    pub fn create_post(&self, post: &Post) -> Result<Post> {
        if !self.user_exists(post.author_id)? {
            return Err(StoreError::NotFound);
        }
        if !self.community_exists(post.community_id)? {
            return Err(StoreError::NotFound);
        }

        let stored = Post {
            like_count: 0,
            comment_count: 0,
            ..post.clone()
        };

        self.conn().execute(
            "INSERT INTO posts (id, content, image_urls, link_url, link_preview_title, link_preview_description, link_preview_image, author_id, community_id, like_count, comment_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                stored.id.to_string(),
                stored.content,
                serde_json::to_string(&stored.image_urls)?,
                stored.link_url,
                stored.link_preview_title,
                stored.link_preview_description,
                stored.link_preview_image,
                stored.author_id.to_string(),
                stored.community_id.to_string(),
                stored.like_count,
                stored.comment_count,
                stored.created_at.to_rfc3339(),
            ],
        )?;

        tracing::debug!(post = %stored.id, community = %stored.community_id, "created post");
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single post by UUID.
    pub fn get_post(&self, id: Uuid) -> Result<Post> {
        self.conn()
            .query_row(
                "SELECT id, content, image_urls, link_url, link_preview_title, link_preview_description, link_preview_image, author_id, community_id, like_count, comment_count, created_at
                 FROM posts
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_post,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List a community's posts, newest first.
    pub fn list_posts_for_community(&self, community_id: Uuid) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, content, image_urls, link_url, link_preview_title, link_preview_description, link_preview_image, author_id, community_id, like_count, comment_count, created_at
             FROM posts
             WHERE community_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![community_id.to_string()], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// List one author's posts across all communities, newest first.
    pub fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, content, image_urls, link_url, link_preview_title, link_preview_description, link_preview_image, author_id, community_id, like_count, comment_count, created_at
             FROM posts
             WHERE author_id = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![author_id.to_string()], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// Compose a user's home feed: posts from every community the user is a
    /// member of, newest first, capped at [`HOME_FEED_LIMIT`].
    ///
    /// A user with no memberships gets an empty feed, not an error.
    pub fn list_home_feed(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, content, image_urls, link_url, link_preview_title, link_preview_description, link_preview_image, author_id, community_id, like_count, comment_count, created_at
             FROM posts
             WHERE community_id IN (SELECT community_id FROM memberships WHERE user_id = ?1)
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), HOME_FEED_LIMIT], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update a post's content, images and link preview.
    ///
    /// The counters and `created_at` are store-maintained and never taken
    /// from the caller; the returned record carries the stored values.
    pub fn update_post(&self, post: &Post) -> Result<Post> {
        let affected = self.conn().execute(
            "UPDATE posts
             SET content = ?1, image_urls = ?2, link_url = ?3, link_preview_title = ?4, link_preview_description = ?5, link_preview_image = ?6
             WHERE id = ?7",
            params![
                post.content,
                serde_json::to_string(&post.image_urls)?,
                post.link_url,
                post.link_preview_title,
                post.link_preview_description,
                post.link_preview_image,
                post.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.get_post(post.id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a post by UUID.  Returns `true` if a row was deleted.
    // ON DELETE CASCADE: comments go with it
    pub fn delete_post(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Likes
    // ------------------------------------------------------------------

    /// Increment a post's like counter.
    ///
    /// There is no per-user like ledger; repeated likes from the same user
    /// each count, and `user_id` is recorded in the trace output only.
    pub fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE posts SET like_count = like_count + 1 WHERE id = ?1",
            params![post_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(post = %post_id, user = %user_id, "post liked");
        Ok(())
    }

    /// Decrement a post's like counter, floored at zero.
    pub fn unlike_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE posts SET like_count = MAX(0, like_count - 1) WHERE id = ?1",
            params![post_id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(post = %post_id, user = %user_id, "post unliked");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Insert a comment and bump the parent post's comment counter in one
    /// transaction.
    ///
    /// Fails with [`StoreError::NotFound`] when the author or the post does
    /// not resolve.
    pub fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        if !self.user_exists(comment.author_id)? {
            return Err(StoreError::NotFound);
        }
        if !self.post_exists(comment.post_id)? {
            return Err(StoreError::NotFound);
        }

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO comments (id, content, author_id, post_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.to_string(),
                comment.content,
                comment.author_id.to_string(),
                comment.post_id.to_string(),
                comment.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?1",
            params![comment.post_id.to_string()],
        )?;
        tx.commit()?;

        tracing::debug!(comment = %comment.id, post = %comment.post_id, "created comment");
        Ok(comment.clone())
    }

    /// List a post's comments in chronological order.
    pub fn list_comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, content, author_id, post_id, created_at
             FROM comments
             WHERE post_id = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![post_id.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// Delete a comment and decrement the parent post's comment counter
    /// (floored at zero) in one transaction.  Returns `false` when the id is
    /// unknown.
    pub fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let post_id: Option<String> = self
            .conn()
            .query_row(
                "SELECT post_id FROM comments WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let post_id = match post_id {
            Some(p) => p,
            None => return Ok(false),
        };

        let tx = self.conn().unchecked_transaction()?;
        tx.execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])?;
        tx.execute(
            "UPDATE posts SET comment_count = MAX(0, comment_count - 1) WHERE id = ?1",
            params![post_id],
        )?;
        tx.commit()?;

        tracing::debug!(comment = %id, post = %post_id, "deleted comment");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn post_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Post`].
fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id_str: String = row.get(0)?;
    let content: String = row.get(1)?;
    let image_urls_json: String = row.get(2)?;
    let link_url: Option<String> = row.get(3)?;
    let link_preview_title: Option<String> = row.get(4)?;
    let link_preview_description: Option<String> = row.get(5)?;
    let link_preview_image: Option<String> = row.get(6)?;
    let author_str: String = row.get(7)?;
    let community_str: String = row.get(8)?;
    let like_count: i64 = row.get(9)?;
    let comment_count: i64 = row.get(10)?;
    let created_str: String = row.get(11)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let image_urls: Vec<String> = serde_json::from_str(&image_urls_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let author_id = Uuid::parse_str(&author_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let community_id = Uuid::parse_str(&community_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Post {
        id,
        content,
        image_urls,
        link_url,
        link_preview_title,
        link_preview_description,
        link_preview_image,
        author_id,
        community_id,
        like_count,
        comment_count,
        created_at,
    })
}

/// Map a `rusqlite::Row` to a [`Comment`].
fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let id_str: String = row.get(0)?;
    let content: String = row.get(1)?;
    let author_str: String = row.get(2)?;
    let post_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let author_id = Uuid::parse_str(&author_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let post_id = Uuid::parse_str(&post_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Comment {
        id,
        content,
        author_id,
        post_id,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Community, CommunityCategory, User};

    fn open_db() -> Database {
        Database::open_in_memory().expect("should open")
    }

    fn new_user(db: &Database, name: &str) -> User {
        db.create_user(&User::new(name, name)).expect("should create user")
    }

    fn new_community(db: &Database, name: &str, creator: Uuid) -> Community {
        db.create_community(&Community::new(
            name,
            "a place to talk",
            CommunityCategory::Technology,
            creator,
        ))
        .expect("should create community")
    }

    fn backdated_post(community: Uuid, author: Uuid, content: &str, seconds_ago: i64) -> Post {
        let mut post = Post::new(community, author, content);
        post.created_at = Utc::now() - chrono::Duration::seconds(seconds_ago);
        post
    }

    #[test]
    fn create_requires_author_and_community() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);

        assert!(matches!(
            db.create_post(&Post::new(community.id, Uuid::new_v4(), "x")),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.create_post(&Post::new(Uuid::new_v4(), author.id, "x")),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn create_zeroes_caller_counters() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);

        let mut draft = Post::new(community.id, author.id, "fresh");
        draft.like_count = 7;
        draft.comment_count = 3;
        let stored = db.create_post(&draft).expect("should create");

        assert_eq!(stored.like_count, 0);
        assert_eq!(stored.comment_count, 0);
        let fetched = db.get_post(stored.id).expect("should fetch");
        assert_eq!(fetched.like_count, 0);
        assert_eq!(fetched.comment_count, 0);
    }

    #[test]
    fn home_feed_follows_memberships() {
        let db = open_db();
        let a = new_user(&db, "a");
        let b = new_user(&db, "b");
        let c = new_user(&db, "c");
        let community = new_community(&db, "Test", a.id);

        db.join_community(community.id, b.id).expect("b joins");
        db.create_post(&Post::new(community.id, a.id, "hello"))
            .expect("a posts");

        let feed_b = db.list_home_feed(b.id).expect("should fetch feed");
        assert_eq!(feed_b.len(), 1);
        assert_eq!(feed_b[0].content, "hello");

        // no memberships: empty feed, not an error
        let feed_c = db.list_home_feed(c.id).expect("should fetch feed");
        assert!(feed_c.is_empty());
    }

    #[test]
    fn home_feed_merges_communities_newest_first_with_cap() {
        let db = open_db();
        let author = new_user(&db, "author");
        let reader = new_user(&db, "reader");
        let first = new_community(&db, "First", author.id);
        let second = new_community(&db, "Second", author.id);
        db.join_community(first.id, reader.id).expect("join first");
        db.join_community(second.id, reader.id).expect("join second");

        // 60 posts alternating between the two communities, oldest first
        for i in 0..60i64 {
            let community = if i % 2 == 0 { first.id } else { second.id };
            db.create_post(&backdated_post(community, author.id, &format!("post {i}"), 120 - i))
                .expect("should create");
        }

        let feed = db.list_home_feed(reader.id).expect("should fetch feed");
        assert_eq!(feed.len(), HOME_FEED_LIMIT as usize);
        assert_eq!(feed[0].content, "post 59"); // newest
        for pair in feed.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn like_counter_floors_at_zero() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);
        let post = db
            .create_post(&Post::new(community.id, author.id, "likeable"))
            .expect("should create");

        db.like_post(post.id, author.id).expect("like 1");
        db.like_post(post.id, author.id).expect("like 2");
        db.like_post(post.id, author.id).expect("like 3");
        db.unlike_post(post.id, author.id).expect("unlike 1");
        assert_eq!(db.get_post(post.id).expect("fetch").like_count, 2);

        for _ in 0..5 {
            db.unlike_post(post.id, author.id).expect("unlike");
        }
        assert_eq!(db.get_post(post.id).expect("fetch").like_count, 0);
    }

    #[test]
    fn like_unknown_post_is_not_found() {
        let db = open_db();
        let user = new_user(&db, "user");
        assert!(matches!(
            db.like_post(Uuid::new_v4(), user.id),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.unlike_post(Uuid::new_v4(), user.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn comment_counter_tracks_comment_rows() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);
        let post = db
            .create_post(&Post::new(community.id, author.id, "discuss"))
            .expect("should create");

        let mut first = Comment::new(post.id, author.id, "first!");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let first = db.create_comment(&first).expect("comment 1");
        let second = db
            .create_comment(&Comment::new(post.id, author.id, "second"))
            .expect("comment 2");
        assert_eq!(db.get_post(post.id).expect("fetch").comment_count, 2);

        let comments = db.list_comments_for_post(post.id).expect("should list");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, first.id); // chronological
        assert_eq!(comments[1].id, second.id);

        assert!(db.delete_comment(first.id).expect("should delete"));
        assert_eq!(db.get_post(post.id).expect("fetch").comment_count, 1);

        // unknown id: no-op, counter untouched
        assert!(!db.delete_comment(Uuid::new_v4()).expect("should no-op"));
        assert_eq!(db.get_post(post.id).expect("fetch").comment_count, 1);
    }

    #[test]
    fn comment_requires_author_and_post() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);
        let post = db
            .create_post(&Post::new(community.id, author.id, "solo"))
            .expect("should create");

        assert!(matches!(
            db.create_comment(&Comment::new(post.id, Uuid::new_v4(), "ghost")),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.create_comment(&Comment::new(Uuid::new_v4(), author.id, "lost")),
            Err(StoreError::NotFound)
        ));
        assert_eq!(db.get_post(post.id).expect("fetch").comment_count, 0);
    }

    #[test]
    fn update_keeps_store_owned_counters() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);
        let mut post = db
            .create_post(&Post::new(community.id, author.id, "draft"))
            .expect("should create");
        db.like_post(post.id, author.id).expect("like");

        post.content = "edited".to_string();
        post.link_url = Some("https://example.com".to_string());
        post.like_count = 999;
        let updated = db.update_post(&post).expect("should update");

        assert_eq!(updated.content, "edited");
        assert_eq!(updated.link_url.as_deref(), Some("https://example.com"));
        assert_eq!(updated.like_count, 1);
    }

    #[test]
    fn listings_are_newest_first() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);

        let old = db
            .create_post(&backdated_post(community.id, author.id, "old", 60))
            .expect("create old");
        let new = db
            .create_post(&backdated_post(community.id, author.id, "new", 1))
            .expect("create new");

        let by_community = db
            .list_posts_for_community(community.id)
            .expect("should list");
        assert_eq!(by_community[0].id, new.id);
        assert_eq!(by_community[1].id, old.id);

        let by_author = db.list_posts_by_author(author.id).expect("should list");
        assert_eq!(by_author[0].id, new.id);
        assert_eq!(by_author[1].id, old.id);
    }

    #[test]
    fn delete_post_cascades_comments() {
        let db = open_db();
        let author = new_user(&db, "author");
        let community = new_community(&db, "Home", author.id);
        let post = db
            .create_post(&Post::new(community.id, author.id, "going away"))
            .expect("should create");
        db.create_comment(&Comment::new(post.id, author.id, "bye"))
            .expect("should comment");

        assert!(db.delete_post(post.id).expect("should delete"));
        assert!(!db.delete_post(post.id).expect("second delete"));

        let remaining = db.list_comments_for_post(post.id).expect("should list");
        assert!(remaining.is_empty());
    }
}
