use std::sync::{Mutex, MutexGuard};

use adieu_core::error::{ErrorBody, codes};
use adieu_core::SessionSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored session for the CLI
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub api_url: String,
    pub access_token: String,
    /// Email or phone login of the signed-in account
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

pub fn eprint_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("{{\"error\":\"{}\",\"message\":\"{e}\"}}", codes::CLI_ERROR),
    }
}

/// Usage error: bad flags, missing session. Exits with 4.
pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    exit_with(message, docs_hint, 4)
}

pub fn exit_with(message: &str, docs_hint: Option<&str>, code: i32) -> ! {
    let mut err = ErrorBody::new(codes::CLI_ERROR, message);
    if let Some(hint) = docs_hint {
        err = err.with_docs_hint(hint);
    }
    eprint_json(&err);
    std::process::exit(code);
}

pub fn config_path() -> std::path::PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("adieu");
    config_dir.join("config.json")
}

/// Outcome of the last failed closure, kept until the next close-account screen closes.
pub fn closure_error_path() -> std::path::PathBuf {
    config_path().with_file_name("closure_error.json")
}

pub fn parse_credentials(data: &str) -> Option<StoredCredentials> {
    serde_json::from_str(data).ok()
}

pub fn load_credentials() -> Option<StoredCredentials> {
    let data = std::fs::read_to_string(config_path()).ok()?;
    parse_credentials(&data)
}

/// Delete a file, treating "already gone" as success.
pub fn remove_if_exists(path: &std::path::Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Resolve a Bearer token for API requests (priority order):
/// 1. ADIEU_API_KEY env var
/// 2. ~/.config/adieu/config.json
/// 3. Error
pub fn resolve_token() -> Result<String, Box<dyn std::error::Error>> {
    if let Ok(key) = std::env::var("ADIEU_API_KEY") {
        return Ok(key);
    }

    if let Some(creds) = load_credentials() {
        if creds.is_expired(Utc::now()) {
            return Err("Stored session has expired. Sign in again.".into());
        }
        return Ok(creds.access_token);
    }

    Err("No credentials found. Sign in or set ADIEU_API_KEY.".into())
}

/// Where the current identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Env,
    Stored,
}

pub fn resolve_identity() -> Option<(String, IdentitySource)> {
    if let Ok(identity) = std::env::var("ADIEU_SESSION_IDENTITY") {
        return Some((identity, IdentitySource::Env));
    }
    load_credentials()
        .and_then(|creds| creds.identity)
        .map(|identity| (identity, IdentitySource::Stored))
}

/// Session backed by the environment and the stored credentials file.
/// Re-read on every query so a sign-in from another terminal is picked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredSession;

impl SessionSource for StoredSession {
    fn identity(&self) -> Option<String> {
        resolve_identity().map(|(identity, _)| identity)
    }
}

/// Lock that keeps going if another holder panicked; the guarded data is plain values.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Map an HTTP status to the CLI exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}
