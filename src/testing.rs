//! Test doubles shared by the unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::traits::{SendOptions, Session};
use crate::domain::types::{
    AdminRole, Envelope, GroupMetadata, MessageContent, MessageKey, Participant,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub quoted: Option<String>,
}

/// Records every outbound call; serves group metadata from a fixed map.
pub struct MockSession {
    own_id: Option<String>,
    groups: HashMap<String, GroupMetadata>,
    fail_sends: bool,
    sent: Mutex<Vec<SentMessage>>,
    removed: Mutex<Vec<(String, Vec<String>)>>,
    metadata_calls: AtomicUsize,
}

impl MockSession {
    pub fn new(own_id: &str) -> Self {
        Self {
            own_id: Some(own_id.to_string()),
            groups: HashMap::new(),
            fail_sends: false,
            sent: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            metadata_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_group(mut self, group: GroupMetadata) -> Self {
        self.groups.insert(group.id.clone(), group);
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(String, Vec<String>)> {
        self.removed.lock().unwrap().clone()
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for MockSession {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions<'_>,
    ) -> Result<String> {
        if self.fail_sends {
            return Err(anyhow!("send refused"));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            quoted: options.quoted.map(|k| k.id.clone()),
        });
        Ok(format!("out-{}", sent.len()))
    }

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.groups
            .get(chat_id)
            .cloned()
            .ok_or_else(|| anyhow!("item-not-found: {chat_id}"))
    }

    async fn remove_participants(&self, chat_id: &str, participants: &[String]) -> Result<()> {
        self.removed
            .lock()
            .unwrap()
            .push((chat_id.to_string(), participants.to_vec()));
        Ok(())
    }

    fn own_id(&self) -> Option<String> {
        self.own_id.clone()
    }
}

pub fn direct_message(from: &str, text: &str) -> Envelope {
    Envelope {
        key: MessageKey {
            remote_jid: from.to_string(),
            id: "in-1".to_string(),
            from_me: false,
            participant: None,
        },
        push_name: Some("Tester".to_string()),
        message: Some(MessageContent::Conversation {
            text: text.to_string(),
        }),
        timestamp: None,
    }
}

pub fn group_message(group: &str, participant: &str, text: &str) -> Envelope {
    Envelope {
        key: MessageKey {
            remote_jid: group.to_string(),
            id: "in-1".to_string(),
            from_me: false,
            participant: Some(participant.to_string()),
        },
        push_name: Some("Tester".to_string()),
        message: Some(MessageContent::ExtendedText {
            text: text.to_string(),
        }),
        timestamp: None,
    }
}

pub fn group_with_admins(id: &str, admins: &[&str], members: &[&str]) -> GroupMetadata {
    let admins = admins.iter().map(|a| Participant {
        id: a.to_string(),
        admin: Some(AdminRole::Admin),
    });
    let members = members.iter().map(|m| Participant {
        id: m.to_string(),
        admin: None,
    });
    GroupMetadata {
        id: id.to_string(),
        subject: "Test Group".to_string(),
        desc: None,
        owner: None,
        participants: admins.chain(members).collect(),
    }
}
