use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    participant_key TEXT NOT NULL,             -- sorted participant UUIDs joined with ':'
    last_message_at TEXT NOT NULL              -- ISO-8601
);

-- at most one conversation per participant set
CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_participant_key
    ON conversations(participant_key);

-- ----------------------------------------------------------------
-- Conversation participants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL,             -- FK -> conversations(id)
    user_id         TEXT NOT NULL,             -- FK -> users(id)

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_conversation_participants_user
    ON conversation_participants(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    sender_id       TEXT NOT NULL,              -- FK -> users(id)
    content         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    sent_at         TEXT NOT NULL,              -- ISO-8601

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_sent
    ON messages(conversation_id, sent_at);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
