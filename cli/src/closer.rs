use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use adieu_core::ClosureActions;
use adieu_core::error::codes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::util::{client, config_path, exit_code_for_status, lock, remove_if_exists};

/// A failed closure attempt, kept until the next close-account screen is torn down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureFailure {
    pub exit_code: i32,
    pub body: serde_json::Value,
}

impl ClosureFailure {
    pub fn message(&self) -> String {
        self.body
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string())
    }
}

/// Slot for the latest closure error. Clones share the slot.
///
/// The file-backed store survives the process, so a failure reported after one visit
/// is still on screen at the next one.
#[derive(Debug, Clone)]
pub struct ClosureErrorStore(Backing);

#[derive(Debug, Clone)]
enum Backing {
    Memory(Arc<Mutex<Option<ClosureFailure>>>),
    File(Arc<PathBuf>),
}

impl Default for ClosureErrorStore {
    fn default() -> Self {
        Self(Backing::Memory(Arc::new(Mutex::new(None))))
    }
}

impl ClosureErrorStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self(Backing::File(Arc::new(path.into())))
    }

    pub fn record(&self, failure: ClosureFailure) {
        match &self.0 {
            Backing::Memory(slot) => *lock(slot) = Some(failure),
            Backing::File(path) => {
                if let Err(e) = write_failure(path, &failure) {
                    tracing::warn!(path = %path.display(), error = %e, "could not persist closure error");
                }
            }
        }
    }

    pub fn current(&self) -> Option<ClosureFailure> {
        match &self.0 {
            Backing::Memory(slot) => lock(slot).clone(),
            Backing::File(path) => {
                let data = std::fs::read_to_string(path.as_path()).ok()?;
                serde_json::from_str(&data).ok()
            }
        }
    }

    pub fn clear(&self) {
        match &self.0 {
            Backing::Memory(slot) => {
                lock(slot).take();
            }
            Backing::File(path) => {
                if let Err(e) = remove_if_exists(path) {
                    tracing::warn!(path = %path.display(), error = %e, "could not clear closure error");
                }
            }
        }
    }
}

fn write_failure(path: &std::path::Path, failure: &ClosureFailure) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(failure).map_err(std::io::Error::other)?;
    std::fs::write(path, data)
}

type ClosureOutcome = Result<serde_json::Value, ClosureFailure>;

/// Closes the account through `DELETE /v1/account`.
///
/// Dispatch is spawned onto the tokio runtime so the screen never waits on the network.
/// [`HttpAccountCloser::wait`] collects the outcome afterwards and records a failure in
/// the error store.
pub struct HttpAccountCloser {
    runtime: Handle,
    api_url: String,
    token: String,
    errors: ClosureErrorStore,
    credentials_path: PathBuf,
    pending: Mutex<Vec<JoinHandle<ClosureOutcome>>>,
}

impl HttpAccountCloser {
    pub fn new(runtime: Handle, api_url: &str, token: String, errors: ClosureErrorStore) -> Self {
        Self {
            runtime,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            errors,
            credentials_path: config_path(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Stored session removed once the account is gone.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    /// Await every dispatched closure. `Ok(None)` if nothing was dispatched.
    pub async fn wait(&self) -> Result<Option<serde_json::Value>, ClosureFailure> {
        let tasks = std::mem::take(&mut *lock(&self.pending));
        let mut response = None;
        for task in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "account closure task failed");
                    Err(ClosureFailure {
                        exit_code: 2,
                        body: json!({
                            "error": codes::CLOSURE_FAILED,
                            "message": format!("Account closure did not complete: {e}")
                        }),
                    })
                }
            };
            match outcome {
                Ok(body) => response = Some(body),
                Err(failure) => {
                    self.errors.record(failure.clone());
                    return Err(failure);
                }
            }
        }
        Ok(response)
    }
}

impl ClosureActions for HttpAccountCloser {
    fn close_account(&self, reason_for_leaving: &str) {
        let task = self.runtime.spawn(delete_account(
            self.api_url.clone(),
            self.token.clone(),
            reason_for_leaving.to_string(),
            self.credentials_path.clone(),
        ));
        lock(&self.pending).push(task);
    }

    fn clear_closure_error(&self) {
        self.errors.clear();
    }
}

/// Split a server answer into success or a failure carrying the CLI exit code.
pub fn classify_response(status: u16, body: serde_json::Value) -> ClosureOutcome {
    match exit_code_for_status(status) {
        0 if body.is_null() => Ok(json!({ "status": status })),
        0 => Ok(body),
        exit_code if body.is_null() => Err(ClosureFailure {
            exit_code,
            body: json!({
                "error": codes::CLOSURE_FAILED,
                "message": format!("Account closure failed with HTTP {status}")
            }),
        }),
        exit_code => Err(ClosureFailure { exit_code, body }),
    }
}

async fn delete_account(
    api_url: String,
    token: String,
    reason_for_leaving: String,
    credentials_path: PathBuf,
) -> ClosureOutcome {
    let url = url::Url::parse(&format!("{api_url}/v1/account")).map_err(|e| ClosureFailure {
        exit_code: 4,
        body: json!({
            "error": codes::CLI_ERROR,
            "message": format!("Invalid URL: {api_url}/v1/account: {e}"),
            "docs_hint": "Check --api-url or ADIEU_API_URL."
        }),
    })?;

    let request_id = uuid::Uuid::now_v7().to_string();
    tracing::info!(%request_id, "sending account closure request");

    let resp = client()
        .delete(url)
        .bearer_auth(&token)
        .header("x-request-id", &request_id)
        .json(&json!({ "reason_for_leaving": reason_for_leaving }))
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(%request_id, error = %e, "account closure request failed");
            ClosureFailure {
                exit_code: 3,
                body: json!({
                    "error": codes::CONNECTION_ERROR,
                    "message": format!("{e}"),
                    "docs_hint": "Is the API server running? Check ADIEU_API_URL."
                }),
            }
        })?;

    let status = resp.status().as_u16();
    let body = resp.json().await.unwrap_or(serde_json::Value::Null);

    let outcome = classify_response(status, body);
    match &outcome {
        Ok(_) => {
            tracing::info!(%request_id, status, "account closed");
            if let Err(e) = remove_if_exists(&credentials_path) {
                tracing::warn!(error = %e, "could not remove stored credentials");
            }
        }
        Err(_) => tracing::warn!(%request_id, status, "account closure rejected"),
    }
    outcome
}
