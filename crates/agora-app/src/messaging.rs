//! Conversation hydration and messaging on behalf of the signed-in user.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use agora_store::{Conversation, Message, User};

use crate::app::App;
use crate::error::Result;

/// One conversation as the inbox screen renders it: the other participants,
/// the latest message for the preview line, and the unread badge count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPreview {
    pub conversation: Conversation,
    pub others: Vec<User>,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

impl App {
    /// The signed-in user's conversations, most recently active first,
    /// hydrated for the inbox screen.
    pub fn conversation_previews(&self) -> Result<Vec<ConversationPreview>> {
        let me = self.require_user()?;
        let conversations = self.db.list_conversations_for_user(me.id)?;

        let mut users: HashMap<Uuid, User> = HashMap::new();
        let mut previews = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            let mut others = Vec::new();
            for participant_id in &conversation.participant_ids {
                if *participant_id == me.id {
                    continue;
                }
                let user = match users.get(participant_id) {
                    Some(user) => user.clone(),
                    None => {
                        let user = self.db.get_user(*participant_id)?;
                        users.insert(*participant_id, user.clone());
                        user
                    }
                };
                others.push(user);
            }

            let last_message = self.db.last_message_in_conversation(conversation.id)?;
            let unread_count = self.db.unread_count(conversation.id, me.id)?;

            previews.push(ConversationPreview {
                conversation,
                others,
                last_message,
                unread_count,
            });
        }

        Ok(previews)
    }

    /// Find or start a conversation between the signed-in user and `others`.
    /// The signed-in user is always part of the set, listed or not.
    pub fn start_conversation(&self, others: &[Uuid]) -> Result<Conversation> {
        let me = self.require_user()?;

        let mut participants = Vec::with_capacity(others.len() + 1);
        participants.push(me.id);
        participants.extend_from_slice(others);

        Ok(self.db.find_or_create_conversation(&participants)?)
    }

    /// Send a text message from the signed-in user.
    pub fn send_text(&self, conversation_id: Uuid, content: &str) -> Result<Message> {
        let me = self.require_user()?;
        let message = Message::new(conversation_id, me.id, content);
        Ok(self.db.send_message(&message)?)
    }

    /// Mark everything the other participants sent in this conversation as
    /// read. Returns how many messages changed state.
    pub fn mark_read(&self, conversation_id: Uuid) -> Result<usize> {
        let me = self.require_user()?;
        Ok(self.db.mark_conversation_read(conversation_id, me.id)?)
    }
}
