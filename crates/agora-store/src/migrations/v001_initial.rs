//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `communities`, `memberships`,
//! `posts`, and `comments`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username     TEXT NOT NULL UNIQUE,        -- normalized: trimmed, lowercase
    display_name TEXT NOT NULL,
    email        TEXT NOT NULL DEFAULT '',
    avatar_url   TEXT,
    bio          TEXT,
    interests    TEXT NOT NULL DEFAULT '[]',  -- JSON array of tags
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Communities
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS communities (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name         TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    category     TEXT NOT NULL,               -- CommunityCategory label
    is_private   INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    creator_id   TEXT NOT NULL,               -- FK -> users(id)
    member_count INTEGER NOT NULL DEFAULT 1,  -- cached membership total
    created_at   TEXT NOT NULL,

    FOREIGN KEY (creator_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_communities_category ON communities(category);

-- ----------------------------------------------------------------
-- Memberships
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS memberships (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id      TEXT NOT NULL,               -- FK -> users(id)
    community_id TEXT NOT NULL,               -- FK -> communities(id)
    role         TEXT NOT NULL DEFAULT 'member',
    joined_at    TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_memberships_unique
    ON memberships(community_id, user_id);
CREATE INDEX IF NOT EXISTS idx_memberships_user ON memberships(user_id);

-- ----------------------------------------------------------------
-- Posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    content       TEXT NOT NULL,
    image_urls    TEXT NOT NULL DEFAULT '[]', -- JSON array of references
    author_id     TEXT NOT NULL,              -- FK -> users(id)
    community_id  TEXT NOT NULL,              -- FK -> communities(id)
    like_count    INTEGER NOT NULL DEFAULT 0, -- cached, floored at 0
    comment_count INTEGER NOT NULL DEFAULT 0, -- cached, floored at 0
    created_at    TEXT NOT NULL,

    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_posts_community_created
    ON posts(community_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);

-- ----------------------------------------------------------------
-- Comments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    content    TEXT NOT NULL,
    author_id  TEXT NOT NULL,                 -- FK -> users(id)
    post_id    TEXT NOT NULL,                 -- FK -> posts(id)
    created_at TEXT NOT NULL,

    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
