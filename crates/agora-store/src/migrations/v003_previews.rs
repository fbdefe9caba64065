use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Cached link-preview columns for posts
ALTER TABLE posts ADD COLUMN link_url TEXT;
ALTER TABLE posts ADD COLUMN link_preview_title TEXT;
ALTER TABLE posts ADD COLUMN link_preview_description TEXT;
ALTER TABLE posts ADD COLUMN link_preview_image TEXT;

-- Banner image for communities
ALTER TABLE communities ADD COLUMN image_url TEXT;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
