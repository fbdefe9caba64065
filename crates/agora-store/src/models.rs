//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.  Enum-valued fields (`CommunityCategory`,
//! `MemberRole`) round-trip through their exact string labels; an unknown
//! label in a stored row is a conversion error, never a silent fallback.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A local user account.
///
/// `username` is unique case-insensitively; the store normalizes it
/// (trim + lowercase) before every write and lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Login handle, stored normalized (trimmed, lowercase).
    pub username: String,
    /// Human-readable name shown in the UI.
    pub display_name: String,
    /// Contact email.  Empty string when never provided.
    pub email: String,
    /// Optional avatar image reference.
    pub avatar_url: Option<String>,
    /// Optional free-form profile text.
    pub bio: Option<String>,
    /// Interest tags, stored as a JSON array.
    pub interests: Vec<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a fresh id, empty optional fields and the current
    /// time.  The username is stored as given; normalization happens in the
    /// store on insert.
    pub fn new(username: &str, display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            email: String::new(),
            avatar_url: None,
            bio: None,
            interests: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

/// A topic community that users join and post into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Community {
    /// Unique community identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Longer description shown on the community page.
    pub description: String,
    /// Optional banner image reference.
    pub image_url: Option<String>,
    /// Fixed category the community files under.
    pub category: CommunityCategory,
    /// Whether the community is invite-only in the UI.
    pub is_private: bool,
    /// The user who created the community (and holds the owner membership).
    pub creator_id: Uuid,
    /// Cached count of active memberships.  Maintained transactionally by
    /// join/leave, never recomputed on the read path.
    pub member_count: i64,
    /// When the community was created.
    pub created_at: DateTime<Utc>,
}

impl Community {
    /// Create a community with a fresh id, public visibility and the current
    /// time.  `member_count` starts at 1 for the creator's owner membership.
    pub fn new(name: &str, description: &str, category: CommunityCategory, creator_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            image_url: None,
            category,
            is_private: false,
            creator_id,
            member_count: 1,
            created_at: Utc::now(),
        }
    }
}

/// Closed set of community categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommunityCategory {
    Technology,
    Art,
    Music,
    Sports,
    Gaming,
    Photography,
    Travel,
    Food,
    Fitness,
    Books,
    Movies,
    Science,
    Nature,
    Fashion,
    #[serde(rename = "DIY")]
    Diy,
    Other,
}

impl CommunityCategory {
    /// Every category, in display order.
    pub const ALL: [CommunityCategory; 16] = [
        CommunityCategory::Technology,
        CommunityCategory::Art,
        CommunityCategory::Music,
        CommunityCategory::Sports,
        CommunityCategory::Gaming,
        CommunityCategory::Photography,
        CommunityCategory::Travel,
        CommunityCategory::Food,
        CommunityCategory::Fitness,
        CommunityCategory::Books,
        CommunityCategory::Movies,
        CommunityCategory::Science,
        CommunityCategory::Nature,
        CommunityCategory::Fashion,
        CommunityCategory::Diy,
        CommunityCategory::Other,
    ];

    /// The exact label stored in SQLite and shown in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunityCategory::Technology => "Technology",
            CommunityCategory::Art => "Art",
            CommunityCategory::Music => "Music",
            CommunityCategory::Sports => "Sports",
            CommunityCategory::Gaming => "Gaming",
            CommunityCategory::Photography => "Photography",
            CommunityCategory::Travel => "Travel",
            CommunityCategory::Food => "Food",
            CommunityCategory::Fitness => "Fitness",
            CommunityCategory::Books => "Books",
            CommunityCategory::Movies => "Movies",
            CommunityCategory::Science => "Science",
            CommunityCategory::Nature => "Nature",
            CommunityCategory::Fashion => "Fashion",
            CommunityCategory::Diy => "DIY",
            CommunityCategory::Other => "Other",
        }
    }
}

impl fmt::Display for CommunityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when a stored category label is not in the closed set.
#[derive(Error, Debug)]
#[error("unknown community category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for CommunityCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommunityCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Join record linking a [`User`] to a [`Community`].  At most one exists per
/// (user, community) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    /// Unique membership identifier.
    pub id: Uuid,
    /// The member.
    pub user_id: Uuid,
    /// The community joined.
    pub community_id: Uuid,
    /// Role held inside the community.
    pub role: MemberRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Create a membership with a fresh id and the current time.
    pub fn new(user_id: Uuid, community_id: Uuid, role: MemberRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            community_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Role a member holds inside a community, stored as its lowercase label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Moderator,
    Member,
}

impl MemberRole {
    /// The exact label stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Moderator => "moderator",
            MemberRole::Member => "member",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when a stored role label is not in the closed set.
#[derive(Error, Debug)]
#[error("unknown member role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for MemberRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "moderator" => Ok(MemberRole::Moderator),
            "member" => Ok(MemberRole::Member),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A post inside a community.
///
/// `like_count` and `comment_count` are cached aggregates maintained by the
/// store; create/update operations never take them from the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Unique post identifier.
    pub id: Uuid,
    /// Post body text.
    pub content: String,
    /// Attached image references, stored as a JSON array.
    pub image_urls: Vec<String>,
    /// Optional outbound link.
    pub link_url: Option<String>,
    /// Cached preview title for `link_url`.
    pub link_preview_title: Option<String>,
    /// Cached preview description for `link_url`.
    pub link_preview_description: Option<String>,
    /// Cached preview image for `link_url`.
    pub link_preview_image: Option<String>,
    /// The posting user.
    pub author_id: Uuid,
    /// The community the post belongs to.
    pub community_id: Uuid,
    /// Cached like counter, floored at zero.
    pub like_count: i64,
    /// Cached comment counter, kept in step with the `comments` table.
    pub comment_count: i64,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a post with a fresh id, zeroed counters and the current time.
    pub fn new(community_id: Uuid, author_id: Uuid, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            image_urls: Vec::new(),
            link_url: None,
            link_preview_title: None,
            link_preview_description: None,
            link_preview_image: None,
            author_id,
            community_id,
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment under a [`Post`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// Unique comment identifier.
    pub id: Uuid,
    /// Comment body text.
    pub content: String,
    /// The commenting user.
    pub author_id: Uuid,
    /// The post commented on.
    pub post_id: Uuid,
    /// When the comment was created.
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create a comment with a fresh id and the current time.
    pub fn new(post_id: Uuid, author_id: Uuid, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id,
            post_id,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A direct-message thread between two or more users.
///
/// Identity is the unordered participant-id set: the store keeps
/// `participant_ids` in canonical sorted order and enforces at most one
/// conversation per set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: Uuid,
    /// Participant user ids, sorted ascending.
    pub participant_ids: Vec<Uuid>,
    /// Timestamp of the newest message (creation time until one exists).
    pub last_message_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single direct message inside a [`Conversation`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// The conversation this message belongs to.
    pub conversation_id: Uuid,
    /// The sending user.
    pub sender_id: Uuid,
    /// Message body text.
    pub content: String,
    /// Whether a recipient has read the message.
    pub is_read: bool,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Create an unread message with a fresh id and the current time.
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            is_read: false,
            sent_at: Utc::now(),
        }
    }
}
