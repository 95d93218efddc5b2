//! # Domain Types
//!
//! Shapes exchanged with the session collaborator: message envelopes, upsert
//! batches and group metadata, plus the identifier conventions used to tell
//! group chats from direct chats.

use serde::{Deserialize, Serialize};

/// Suffix carried by every group chat identifier.
pub const GROUP_SUFFIX: &str = "@g.us";
/// Server part of a user identifier.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Identifies a message and where it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
    /// Chat the message belongs to (group id or direct chat id).
    pub remote_jid: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from_me: bool,
    /// Sending participant, only set for group chats.
    #[serde(default)]
    pub participant: Option<String>,
}

/// Text-bearing payload shapes the bot understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Conversation { text: String },
    ExtendedText { text: String },
    Image {
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        #[serde(default)]
        caption: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// An inbound message as delivered by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub key: MessageKey,
    #[serde(default)]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Envelope {
    pub fn chat_id(&self) -> &str {
        &self.key.remote_jid
    }

    pub fn is_group(&self) -> bool {
        is_group_jid(&self.key.remote_jid)
    }

    /// The participant for group chats, the chat itself otherwise.
    pub fn sender(&self) -> &str {
        if self.is_group() {
            self.key
                .participant
                .as_deref()
                .unwrap_or(&self.key.remote_jid)
        } else {
            &self.key.remote_jid
        }
    }
}

/// Whether an upsert batch is live traffic or a history replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertKind {
    Notify,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    Superadmin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub admin: Option<AdminRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl GroupMetadata {
    pub fn admins(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.admin.is_some())
    }
}

pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

/// User part of an identifier with any device suffix removed.
///
/// `"123:4@s.whatsapp.net"` -> `"123"`.
pub fn bare_user(jid: &str) -> &str {
    let user = jid.split('@').next().unwrap_or(jid);
    user.split(':').next().unwrap_or(user)
}

/// Canonical user identifier (`user@s.whatsapp.net`), device suffix dropped.
/// Group identifiers are returned unchanged.
pub fn normalize_jid(jid: &str) -> String {
    if is_group_jid(jid) {
        return jid.to_string();
    }
    match jid.split_once('@') {
        Some((_, server)) => format!("{}@{}", bare_user(jid), server),
        None => format!("{}@{}", bare_user(jid), USER_SERVER),
    }
}
