//! # Log Strings
//!
//! Operational log lines for command loading, dispatch and the session bridge.

pub fn command_loaded(name: &str) -> String {
    format!("[COMMAND LOADED] {name}")
}

pub fn command_invalid(origin: &str, missing: &str) -> String {
    format!("[COMMAND WARNING] {origin} does not export a valid command (missing {missing})")
}

pub fn command_load_failed(origin: &str, err: &str) -> String {
    format!("[COMMAND ERROR] Failed to load command from {origin}: {err}")
}

pub fn command_collision(key: &str, previous: &str, current: &str) -> String {
    format!("[COMMAND WARNING] '{key}' of '{previous}' is now taken by '{current}'")
}

pub fn source_read_failed(source: &str, err: &str) -> String {
    format!("[COMMAND LOAD ERROR] Failed to read command source {source}: {err}")
}

pub fn source_created(source: &str) -> String {
    format!("[COMMAND INFO] Created command source {source}")
}

pub fn source_create_failed(source: &str, err: &str) -> String {
    format!("[COMMAND LOAD ERROR] Could not create command source {source}: {err}")
}

pub fn registry_ready(commands: usize, keys: usize) -> String {
    format!("Command registry ready: {commands} commands, {keys} names and aliases")
}

pub fn dispatch_failed(command: &str, chat: &str, err: &str) -> String {
    format!("[HANDLER ERROR] Command '{command}' failed in {chat}: {err}")
}

pub fn unknown_command(name: &str, chat: &str) -> String {
    format!("Ignoring unknown command '{name}' in {chat}")
}

pub fn dispatching(command: &str, args: &[String], chat: &str, sender: &str) -> String {
    format!("Dispatching cmd='{command}' args={args:?} chat='{chat}' sender='{sender}'")
}

pub fn command_denied(invoked: &str, sender: &str, reason: &str) -> String {
    format!("Denied '{invoked}' for {sender}: {reason}")
}

pub fn error_notice_failed(chat: &str, err: &str) -> String {
    format!("[HANDLER ERROR] Failed to send error notice to {chat}: {err}")
}

pub const SESSION_STARTING: &str = "Bot starting...";
pub const CONNECTION_OPEN: &str = "[CONNECTION] Opened connection";
pub const LOGGED_OUT: &str = "[CONNECTION] Logged out; remove the session and pair again";
pub const BRIDGE_CLOSED: &str = "Session bridge closed";
pub const SHUTDOWN: &str = "Shutting down...";
pub const CONNECTING: &str = "[CONNECTION] Connecting...";
pub const NO_COMMANDS: &str = "No commands registered; every message will be ignored";
pub const OWNER_NUMBER_UNSET: &str =
    "bot.owner_number is not set; owner-only commands are unreachable";
pub const OWNER_NUMBER_MISSING: &str =
    "Set bot.owner_number in config.yaml to link this device with a pairing code";

pub fn connection_closed(reason: &str) -> String {
    format!("[CONNECTION] Connection closed: {reason}")
}

pub fn logged_in_as(id: &str) -> String {
    format!("Logged in as {id}")
}

pub fn pairing_code(code: &str) -> String {
    format!("[PAIRING CODE] Your pairing code: {code}")
}

pub fn pairing_code_failed(err: &str) -> String {
    format!("[PAIRING CODE ERROR] Failed to request pairing code: {err}")
}

pub fn qr_received(qr: &str) -> String {
    format!("[QR CODE] Scan this payload to link the bot: {qr}")
}

pub fn store_loaded(path: &str, messages: usize) -> String {
    format!("Loaded message store from {path} ({messages} messages)")
}

pub fn store_snapshot_failed(path: &str, err: &str) -> String {
    format!("Failed to write message store snapshot to {path}: {err}")
}

pub fn store_saved(path: &str, messages: usize) -> String {
    format!("Saved message store to {path} ({messages} messages)")
}

pub fn store_unreadable(path: &str, err: &str) -> String {
    format!("Discarding unreadable message store {path}: {err}")
}

pub fn sidecar_started(program: &str) -> String {
    format!("Session sidecar started: {program}")
}

pub fn bridge_bad_line(err: &str) -> String {
    format!("Ignoring malformed bridge line: {err}")
}

pub fn unknown_response(id: u64) -> String {
    format!("Response for unknown request {id}")
}

pub fn get_message_answer_failed(id: u64, err: &str) -> String {
    format!("Failed to answer get_message {id}: {err}")
}

pub fn bridge_failed(err: &str) -> String {
    format!("Session bridge failed: {err}")
}

pub fn signal_failed(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}
