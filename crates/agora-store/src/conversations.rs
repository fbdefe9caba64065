use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Conversation, Message};

impl Database {
    /// Resolve the conversation for an exact participant set, creating it if
    /// none exists.
    ///
    /// The input is deduplicated into an unordered set first, so argument
    /// order and repeats never matter.  Fewer than two distinct participants
    /// is [`StoreError::InvalidInput`]; on a miss every participant must
    /// resolve to a user ([`StoreError::NotFound`]) before the conversation
    /// and its participant rows are inserted in one transaction.
    pub fn find_or_create_conversation(&self, participant_ids: &[Uuid]) -> Result<Conversation> {
        let unique: BTreeSet<Uuid> = participant_ids.iter().copied().collect();
        if unique.len() < 2 {
            return Err(StoreError::InvalidInput(
                "a conversation needs at least two distinct participants".to_string(),
            ));
        }
        let key = participant_key(&unique);

        let existing: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT id, last_message_at FROM conversations WHERE participant_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        if let Some((id_str, ts_str)) = existing {
            let id = Uuid::parse_str(&id_str)?;
            let last_message_at = DateTime::parse_from_rfc3339(&ts_str)?.with_timezone(&Utc);
            return Ok(Conversation {
                id,
                participant_ids: unique.into_iter().collect(),
                last_message_at,
            });
        }

        for id in &unique {
            if !self.user_exists(*id)? {
                return Err(StoreError::NotFound);
            }
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            participant_ids: unique.into_iter().collect(),
            last_message_at: Utc::now(),
        };

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO conversations (id, participant_key, last_message_at)
             VALUES (?1, ?2, ?3)",
            params![
                conversation.id.to_string(),
                key,
                conversation.last_message_at.to_rfc3339(),
            ],
        )?;
        for user_id in &conversation.participant_ids {
            tx.execute(
                "INSERT INTO conversation_participants (conversation_id, user_id)
                 VALUES (?1, ?2)",
                params![conversation.id.to_string(), user_id.to_string()],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            conversation = %conversation.id,
            participants = conversation.participant_ids.len(),
            "created conversation"
        );
        Ok(conversation)
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        let ts_str: String = self
            .conn()
            .query_row(
                "SELECT last_message_at FROM conversations WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        let last_message_at = DateTime::parse_from_rfc3339(&ts_str)?.with_timezone(&Utc);

        Ok(Conversation {
            id,
            participant_ids: self.conversation_participants(id)?,
            last_message_at,
        })
    }

    pub fn list_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.last_message_at
             FROM conversations c
             JOIN conversation_participants p ON p.conversation_id = c.id
             WHERE p.user_id = ?1
             ORDER BY c.last_message_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            let ts_str: String = row.get(1)?;
            Ok((id_str, ts_str))
        })?;

        let mut heads = Vec::new();
        for row in rows {
            heads.push(row?);
        }

        let mut conversations = Vec::new();
        for (id_str, ts_str) in heads {
            let id = Uuid::parse_str(&id_str)?;
            let last_message_at = DateTime::parse_from_rfc3339(&ts_str)?.with_timezone(&Utc);
            conversations.push(Conversation {
                id,
                participant_ids: self.conversation_participants(id)?,
                last_message_at,
            });
        }
        Ok(conversations)
    }

    // ON DELETE CASCADE: participant rows + messages go with it
    pub fn delete_conversation(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Append a message and move the conversation's last-activity timestamp
    /// to the message's sent time, in one transaction.
    pub fn send_message(&self, message: &Message) -> Result<Message> {
        if !self.user_exists(message.sender_id)? {
            return Err(StoreError::NotFound);
        }
        if !self.conversation_exists(message.conversation_id)? {
            return Err(StoreError::NotFound);
        }

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO messages (id, conversation_id, sender_id, content, is_read, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.sender_id.to_string(),
                message.content,
                message.is_read as i32,
                message.sent_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
            params![
                message.sent_at.to_rfc3339(),
                message.conversation_id.to_string(),
            ],
        )?;
        tx.commit()?;

        tracing::debug!(message = %message.id, conversation = %message.conversation_id, "sent message");
        Ok(message.clone())
    }

    pub fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, conversation_id, sender_id, content, is_read, sent_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY sent_at ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    pub fn mark_message_read(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Mark every unread message in the conversation not sent by `reader` as
    /// read, in one batch.  Returns how many messages changed; `Ok(0)` when
    /// nothing matched.
    pub fn mark_conversation_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages
             SET is_read = 1
             WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![conversation_id.to_string(), reader_id.to_string()],
        )?;

        if affected > 0 {
            tracing::debug!(
                conversation = %conversation_id,
                reader = %reader_id,
                marked = affected,
                "marked conversation read"
            );
        }
        Ok(affected)
    }

    pub fn last_message_in_conversation(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        self.conn()
            .query_row(
                "SELECT id, conversation_id, sender_id, content, is_read, sent_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY sent_at DESC
                 LIMIT 1",
                params![conversation_id.to_string()],
                row_to_message,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn unread_count(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages
             WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![conversation_id.to_string(), reader_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn conversation_participants(&self, conversation_id: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM conversation_participants
             WHERE conversation_id = ?1
             ORDER BY user_id ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            Uuid::parse_str(&id_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn conversation_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ?1)",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

/// Canonical identity of a participant set: the sorted UUID strings joined
/// with `:`.  Matches the UNIQUE `participant_key` column.
fn participant_key(participants: &BTreeSet<Uuid>) -> String {
    participants
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(":")
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_str: String = row.get(1)?;
    let sender_str: String = row.get(2)?;
    let content: String = row.get(3)?;
    let is_read: bool = row.get(4)?;
    let sent_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let conversation_id = Uuid::parse_str(&conversation_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let sender_id = Uuid::parse_str(&sender_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let sent_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&sent_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id,
        conversation_id,
        sender_id,
        content,
        is_read,
        sent_at,
    })
}
