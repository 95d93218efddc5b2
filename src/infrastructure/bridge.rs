//! # Session Bridge
//!
//! Implements the `Session` trait over a JSON-lines channel to a sidecar that
//! owns the actual WhatsApp Web connection. Every line is one tagged JSON
//! object. Requests carry a numeric `id`; the sidecar answers each with a
//! `response` event carrying the same id.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, oneshot};

use crate::application::dispatcher::Dispatcher;
use crate::application::store::MessageStore;
use crate::domain::traits::{SendOptions, Session};
use crate::domain::types::{Envelope, GroupMetadata, MessageKey, UpsertKind};
use crate::strings::logs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

/// Lines the sidecar sends us.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Ready {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        registered: bool,
    },
    Qr {
        qr: String,
    },
    /// Pushed by sidecars that request the pairing code themselves.
    PairingCode {
        code: String,
    },
    Connection {
        state: ConnectionState,
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        logged_out: bool,
    },
    MessagesUpsert {
        kind: UpsertKind,
        messages: Vec<Envelope>,
    },
    GetMessage {
        id: u64,
        chat_id: String,
        message_id: String,
    },
    Response {
        id: u64,
        ok: bool,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Lines we send to the sidecar.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    SendMessage {
        id: u64,
        chat_id: &'a str,
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        quoted: Option<&'a MessageKey>,
    },
    GroupMetadata {
        id: u64,
        chat_id: &'a str,
    },
    RemoveParticipants {
        id: u64,
        chat_id: &'a str,
        participants: &'a [String],
    },
    RequestPairingCode {
        id: u64,
        phone: &'a str,
    },
    /// Answer to a `get_message` event.
    Message {
        id: u64,
        message: Option<&'a Envelope>,
    },
}

type Pending = HashMap<u64, oneshot::Sender<Result<Value>>>;

pub struct BridgeSession {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: StdMutex<Pending>,
    next_id: AtomicU64,
    own_id: StdRwLock<Option<String>>,
}

impl BridgeSession {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            pending: StdMutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            own_id: StdRwLock::new(None),
        }
    }

    pub fn set_own_id(&self, id: Option<String>) {
        if let Ok(mut own) = self.own_id.write() {
            *own = id;
        }
    }

    async fn write_line(&self, request: &BridgeRequest<'_>) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to session bridge")?;
        writer.flush().await?;
        Ok(())
    }

    /// Sends a request and waits for the matching `response`.
    async fn request<'r, F>(&self, build: F) -> Result<Value>
    where
        F: FnOnce(u64) -> BridgeRequest<'r>,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| anyhow!("bridge pending map poisoned"))?
            .insert(id, tx);

        if let Err(e) = self.write_line(&build(id)).await {
            self.forget(id);
            return Err(e);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => bail!("session bridge closed before request {id} was answered"),
            Err(_) => {
                self.forget(id);
                bail!("request {id} timed out after {}s", REQUEST_TIMEOUT.as_secs())
            }
        }
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }

    /// Completes the pending request a `response` belongs to. Every other
    /// event is handed back to the caller.
    pub fn accept(&self, event: BridgeEvent) -> Option<BridgeEvent> {
        let BridgeEvent::Response {
            id,
            ok,
            result,
            error,
        } = event
        else {
            return Some(event);
        };
        let waiter = self.pending.lock().ok().and_then(|mut p| p.remove(&id));
        match waiter {
            Some(tx) => {
                let outcome = if ok {
                    Ok(result)
                } else {
                    Err(anyhow!(error.unwrap_or_else(|| "request failed".to_string())))
                };
                let _ = tx.send(outcome);
            }
            None => tracing::debug!("{}", logs::unknown_response(id)),
        }
        None
    }

    /// Fails every outstanding request, e.g. once the bridge has closed.
    pub fn fail_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, tx) in pending.drain() {
                let _ = tx.send(Err(anyhow!("session bridge closed")));
            }
        }
    }

    pub async fn request_pairing_code(&self, phone: &str) -> Result<String> {
        let value = self
            .request(|id| BridgeRequest::RequestPairingCode { id, phone })
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("pairing code response was not a string"))
    }

    pub async fn answer_get_message(&self, id: u64, message: Option<&Envelope>) -> Result<()> {
        self.write_line(&BridgeRequest::Message { id, message }).await
    }
}

#[async_trait]
impl Session for BridgeSession {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        options: SendOptions<'_>,
    ) -> Result<String> {
        let quoted = options.quoted;
        let value = self
            .request(|id| BridgeRequest::SendMessage {
                id,
                chat_id,
                text,
                quoted,
            })
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata> {
        let value = self
            .request(|id| BridgeRequest::GroupMetadata { id, chat_id })
            .await?;
        serde_json::from_value(value).context("Malformed group metadata")
    }

    async fn remove_participants(&self, chat_id: &str, participants: &[String]) -> Result<()> {
        self.request(|id| BridgeRequest::RemoveParticipants {
            id,
            chat_id,
            participants,
        })
        .await?;
        Ok(())
    }

    fn own_id(&self) -> Option<String> {
        self.own_id.read().ok().and_then(|id| id.clone())
    }
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    Closed,
    LoggedOut,
}

/// Reads bridge events and routes them to the dispatcher and the store.
pub struct BridgeRunner {
    pub session: Arc<BridgeSession>,
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<MessageStore>,
    /// Digits of the number to link with a pairing code, if any.
    pub pairing_phone: Option<String>,
    pub pairing_delay: Duration,
}

impl BridgeRunner {
    /// Runs until the bridge closes or the session is logged out. Pending
    /// requests are failed on every exit path.
    pub async fn run<R>(&self, reader: R) -> Result<BridgeExit>
    where
        R: AsyncBufRead + Unpin,
    {
        let result = self.pump(reader).await;
        self.session.fail_pending();
        tracing::info!("{}", logs::BRIDGE_CLOSED);
        result
    }

    async fn pump<R>(&self, mut reader: R) -> Result<BridgeExit>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader
                .read_until(b'\n', &mut buf)
                .await
                .context("Failed to read from session bridge")?
                == 0
            {
                return Ok(BridgeExit::Closed);
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = match serde_json::from_str::<BridgeEvent>(line) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("{}", logs::bridge_bad_line(&e.to_string()));
                    continue;
                }
            };
            if let Some(event) = self.session.accept(event) {
                if let Some(exit) = self.on_event(event).await {
                    return Ok(exit);
                }
            }
        }
    }

    async fn on_event(&self, event: BridgeEvent) -> Option<BridgeExit> {
        match event {
            BridgeEvent::Ready {
                user_id,
                registered,
            } => {
                if let Some(id) = &user_id {
                    tracing::info!("{}", logs::logged_in_as(id));
                }
                self.session.set_own_id(user_id);
                if !registered {
                    self.spawn_pairing();
                }
            }
            BridgeEvent::Qr { qr } => tracing::info!("{}", logs::qr_received(&qr)),
            BridgeEvent::PairingCode { code } => tracing::info!("{}", logs::pairing_code(&code)),
            BridgeEvent::Connection {
                state,
                reason,
                logged_out,
            } => match state {
                ConnectionState::Open => tracing::info!("{}", logs::CONNECTION_OPEN),
                ConnectionState::Connecting => tracing::debug!("{}", logs::CONNECTING),
                ConnectionState::Close if logged_out => {
                    tracing::error!("{}", logs::LOGGED_OUT);
                    return Some(BridgeExit::LoggedOut);
                }
                ConnectionState::Close => tracing::warn!(
                    "{}",
                    logs::connection_closed(reason.as_deref().unwrap_or("unknown"))
                ),
            },
            BridgeEvent::MessagesUpsert { kind, messages } => {
                self.store.record(&messages).await;
                self.dispatcher.handle_upsert(kind, messages);
            }
            BridgeEvent::GetMessage {
                id,
                chat_id,
                message_id,
            } => {
                let message = self.store.get(&chat_id, &message_id).await;
                if let Err(e) = self.session.answer_get_message(id, message.as_ref()).await {
                    tracing::warn!(
                        "{}",
                        logs::get_message_answer_failed(id, &format!("{e:#}"))
                    );
                }
            }
            BridgeEvent::Response { .. } => {}
        }
        None
    }

    fn spawn_pairing(&self) {
        let Some(phone) = self.pairing_phone.clone().filter(|p| !p.is_empty()) else {
            tracing::warn!("{}", logs::OWNER_NUMBER_MISSING);
            return;
        };
        let session = Arc::clone(&self.session);
        let delay = self.pairing_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match session.request_pairing_code(&phone).await {
                Ok(code) => tracing::info!("{}", logs::pairing_code(&code)),
                Err(e) => tracing::error!("{}", logs::pairing_code_failed(&format!("{e:#}"))),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::CommandRegistry;
    use crate::domain::config::AppConfig;
    use crate::interface::commands::BuiltinSource;
    use crate::strings::messages;
    use tempfile::TempDir;
    use tokio::io::{AsyncWriteExt, BufReader, duplex};

    /// Answers every request line with an `ok` response and forwards the
    /// parsed request to the test.
    fn fake_sidecar(
        requests: tokio::io::DuplexStream,
        responses: Arc<BridgeSession>,
    ) -> tokio::sync::mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(requests).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: Value = serde_json::from_str(&line).unwrap();
                if let Some(id) = request["id"].as_u64() {
                    let result = match request["type"].as_str() {
                        Some("group_metadata") => serde_json::json!({
                            "id": "42@g.us",
                            "subject": "Bridge Group",
                            "participants": [{"id": "1@s.whatsapp.net", "admin": "superadmin"}]
                        }),
                        _ => serde_json::json!("out-1"),
                    };
                    if request["type"] != "message" {
                        responses.accept(BridgeEvent::Response {
                            id,
                            ok: true,
                            result,
                            error: None,
                        });
                    }
                }
                let _ = tx.send(request);
            }
        });
        rx
    }

    #[tokio::test]
    async fn test_send_message_round_trip() {
        let (ours, theirs) = duplex(4096);
        let session = Arc::new(BridgeSession::new(ours));
        let mut requests = fake_sidecar(theirs, session.clone());

        let key = MessageKey {
            remote_jid: "555@s.whatsapp.net".into(),
            id: "in-9".into(),
            ..Default::default()
        };
        let id = session
            .send_message("555@s.whatsapp.net", "hello", SendOptions::quoting(&key))
            .await
            .unwrap();

        assert_eq!(id, "out-1");
        let sent = requests.recv().await.unwrap();
        assert_eq!(sent["type"], "send_message");
        assert_eq!(sent["text"], "hello");
        assert_eq!(sent["quoted"]["id"], "in-9");
    }

    #[tokio::test]
    async fn test_group_metadata_is_decoded() {
        let (ours, theirs) = duplex(4096);
        let session = Arc::new(BridgeSession::new(ours));
        let _requests = fake_sidecar(theirs, session.clone());

        let group = session.group_metadata("42@g.us").await.unwrap();

        assert_eq!(group.subject, "Bridge Group");
        assert_eq!(group.admins().count(), 1);
    }

    #[tokio::test]
    async fn test_error_response_fails_request() {
        let (ours, _theirs) = duplex(4096);
        let session = Arc::new(BridgeSession::new(ours));

        let waiting = {
            let session = session.clone();
            tokio::spawn(async move { session.group_metadata("42@g.us").await })
        };
        tokio::task::yield_now().await;
        while session.pending.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        let id = *session.pending.lock().unwrap().keys().next().unwrap();
        session.accept(BridgeEvent::Response {
            id,
            ok: false,
            result: Value::Null,
            error: Some("forbidden".into()),
        });

        let err = waiting.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("forbidden"));
    }

    #[tokio::test]
    async fn test_runner_dispatches_live_messages_and_stores_them() {
        let temp_dir = TempDir::new().unwrap();
        let (ours, theirs) = duplex(64 * 1024);
        let session = Arc::new(BridgeSession::new(ours));
        let mut requests = fake_sidecar(theirs, session.clone());

        let source = BuiltinSource::new(std::time::Instant::now());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(AppConfig::for_tests("!", "111")),
            Arc::new(CommandRegistry::load(&[&source])),
            session.clone(),
        ));
        let store = Arc::new(MessageStore::load(&temp_dir.path().join("store.json"), 10));
        let runner = BridgeRunner {
            session: session.clone(),
            dispatcher,
            store: store.clone(),
            pairing_phone: None,
            pairing_delay: Duration::from_millis(0),
        };

        let (mut feed, events) = duplex(64 * 1024);
        let script = concat!(
            r#"{"type":"ready","user_id":"999:1@s.whatsapp.net","registered":true}"#, "\n",
            "not json\n",
            r#"{"type":"messages_upsert","kind":"append","messages":[{"key":{"remote_jid":"555@s.whatsapp.net","id":"old"},"message":{"type":"conversation","text":"!ping"}}]}"#, "\n",
            r#"{"type":"messages_upsert","kind":"notify","messages":[{"key":{"remote_jid":"555@s.whatsapp.net","id":"new"},"message":{"type":"conversation","text":"!ping"}}]}"#, "\n",
            r#"{"type":"get_message","id":77,"chat_id":"555@s.whatsapp.net","message_id":"old"}"#, "\n",
        );
        feed.write_all(script.as_bytes()).await.unwrap();

        let run = tokio::spawn(async move { runner.run(BufReader::new(events)).await });

        let mut seen = Vec::new();
        while seen.len() < 2 {
            seen.push(requests.recv().await.unwrap());
        }
        drop(feed);
        assert_eq!(run.await.unwrap().unwrap(), BridgeExit::Closed);

        let reply = seen.iter().find(|r| r["type"] == "send_message").unwrap();
        assert_eq!(reply["text"], messages::PONG);
        assert_eq!(reply["quoted"]["id"], "new");
        let answer = seen.iter().find(|r| r["type"] == "message").unwrap();
        assert_eq!(answer["id"], 77);
        assert_eq!(answer["message"]["key"]["id"], "old");

        assert_eq!(session.own_id().as_deref(), Some("999:1@s.whatsapp.net"));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_logged_out_close_stops_runner() {
        let temp_dir = TempDir::new().unwrap();
        let (ours, _theirs) = duplex(4096);
        let session = Arc::new(BridgeSession::new(ours));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(AppConfig::for_tests("!", "111")),
            Arc::new(CommandRegistry::empty()),
            session.clone(),
        ));
        let runner = BridgeRunner {
            session,
            dispatcher,
            store: Arc::new(MessageStore::load(&temp_dir.path().join("s.json"), 10)),
            pairing_phone: None,
            pairing_delay: Duration::from_millis(0),
        };

        let script = concat!(
            r#"{"type":"connection","state":"close","reason":"stream errored"}"#, "\n",
            r#"{"type":"connection","state":"close","logged_out":true}"#, "\n",
            r#"{"type":"connection","state":"open"}"#, "\n",
        );
        let exit = runner.run(BufReader::new(script.as_bytes())).await.unwrap();

        assert_eq!(exit, BridgeExit::LoggedOut);
    }

    fn idle_runner(temp_dir: &TempDir, session: Arc<BridgeSession>) -> BridgeRunner {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(AppConfig::for_tests("!", "111")),
            Arc::new(CommandRegistry::empty()),
            session.clone(),
        ));
        BridgeRunner {
            session,
            dispatcher,
            store: Arc::new(MessageStore::load(&temp_dir.path().join("s.json"), 10)),
            pairing_phone: None,
            pairing_delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let (ours, _theirs) = duplex(4096);
        let runner = idle_runner(&temp_dir, Arc::new(BridgeSession::new(ours)));

        let mut script = b"\xff\xfe garbage\n".to_vec();
        script.extend_from_slice(
            br#"{"type":"messages_upsert","kind":"append","messages":[{"key":{"remote_jid":"555@s.whatsapp.net","id":"after"}}]}"#,
        );
        script.push(b'\n');
        let exit = runner.run(BufReader::new(&script[..])).await.unwrap();

        assert_eq!(exit, BridgeExit::Closed);
        assert_eq!(runner.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_read_error_fails_pending_requests() {
        let temp_dir = TempDir::new().unwrap();
        let (ours, _theirs) = duplex(4096);
        let session = Arc::new(BridgeSession::new(ours));
        let runner = idle_runner(&temp_dir, session.clone());

        let waiting = {
            let session = session.clone();
            tokio::spawn(async move { session.group_metadata("42@g.us").await })
        };
        while session.pending.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }

        let broken = failing_io::Failing;
        assert!(runner.run(BufReader::new(broken)).await.is_err());

        let err = waiting.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_pairing_code_event_parses() {
        let event: BridgeEvent =
            serde_json::from_str(r#"{"type":"pairing_code","code":"ABCD-1234"}"#).unwrap();
        assert!(matches!(event, BridgeEvent::PairingCode { code } if code == "ABCD-1234"));
    }

    #[tokio::test]
    async fn test_pushed_pairing_code_keeps_runner_going() {
        let temp_dir = TempDir::new().unwrap();
        let (ours, _theirs) = duplex(4096);
        let runner = idle_runner(&temp_dir, Arc::new(BridgeSession::new(ours)));

        let script = concat!(
            r#"{"type":"pairing_code","code":"ABCD-1234"}"#, "\n",
            r#"{"type":"messages_upsert","kind":"append","messages":[{"key":{"remote_jid":"555@s.whatsapp.net","id":"m"}}]}"#, "\n",
        );
        let exit = runner.run(BufReader::new(script.as_bytes())).await.unwrap();

        assert_eq!(exit, BridgeExit::Closed);
        assert_eq!(runner.store.len().await, 1);
    }

    mod failing_io {
        use std::io;
        use std::pin::Pin;
        use std::task::{Context, Poll};
        use tokio::io::{AsyncRead, ReadBuf};

        /// Reader whose every read fails.
        pub struct Failing;

        impl AsyncRead for Failing {
            fn poll_read(
                self: Pin<&mut Self>,
                _cx: &mut Context<'_>,
                _buf: &mut ReadBuf<'_>,
            ) -> Poll<io::Result<()>> {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "sidecar gone")))
            }
        }
    }
}
