//! # Message Store
//!
//! Keeps the most recent messages of every chat so the session can ask for
//! them again (e.g. to retry a failed decryption). The store is restored from
//! a JSON snapshot at startup and written back periodically.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::types::Envelope;
use crate::strings::logs;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    chats: HashMap<String, VecDeque<Envelope>>,
}

pub struct MessageStore {
    path: PathBuf,
    capacity: usize,
    data: Mutex<StoreData>,
}

impl MessageStore {
    /// Restores the snapshot at `path`, or starts empty if there is none.
    pub fn load(path: &Path, capacity: usize) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<StoreData>(&content) {
                Ok(data) => {
                    let count = data.chats.values().map(VecDeque::len).sum();
                    tracing::info!("{}", logs::store_loaded(&path.display().to_string(), count));
                    data
                }
                Err(e) => {
                    tracing::warn!(
                        "{}",
                        logs::store_unreadable(&path.display().to_string(), &e.to_string())
                    );
                    StoreData::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                tracing::warn!(
                    "{}",
                    logs::store_unreadable(&path.display().to_string(), &e.to_string())
                );
                StoreData::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            capacity: capacity.max(1),
            data: Mutex::new(data),
        }
    }

    pub async fn record(&self, messages: &[Envelope]) {
        let mut data = self.data.lock().await;
        for message in messages {
            let chat = data.chats.entry(message.chat_id().to_string()).or_default();
            chat.retain(|m| m.key.id != message.key.id);
            chat.push_back(message.clone());
            while chat.len() > self.capacity {
                chat.pop_front();
            }
        }
    }

    pub async fn get(&self, chat_id: &str, message_id: &str) -> Option<Envelope> {
        let data = self.data.lock().await;
        data.chats
            .get(chat_id)?
            .iter()
            .find(|m| m.key.id == message_id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        let data = self.data.lock().await;
        data.chats.values().map(VecDeque::len).sum()
    }

    /// Writes to a temporary file, then renames it over the snapshot.
    pub async fn snapshot(&self) -> Result<()> {
        let content = {
            let data = self.data.lock().await;
            serde_json::to_string(&*data)?
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Snapshots on a fixed interval until the task is aborted.
    pub fn spawn_snapshots(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = store.snapshot().await {
                    tracing::warn!(
                        "{}",
                        logs::store_snapshot_failed(&store.path.display().to_string(), &format!("{e:#}"))
                    );
                }
            }
        })
    }
}
