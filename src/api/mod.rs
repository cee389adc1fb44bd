mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::{ApiConfig, HttpAdventureApi};

use crate::session::{BattleSession, Rewards, TurnResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerSubmission {
    pub challenge_index: usize,
    pub selected_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub xiaoju_hp: u8,
    pub monsters_defeated: u32,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("the server took too long to answer, please try again")]
    Timeout,
    #[error("your sign-in has expired")]
    Unauthorized,
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum AdventureError {
    #[error("{0}")]
    SessionFetch(RequestError),
    #[error("{0}")]
    Start(RequestError),
    #[error("{0}")]
    Retry(RequestError),
    #[error("{0}")]
    Submit(RequestError),
    #[error("{0}")]
    Complete(RequestError),
    #[error("{0}")]
    Skip(RequestError),
    #[error("{0}")]
    PostcardLookup(RequestError),
}

impl AdventureError {
    pub fn request(&self) -> &RequestError {
        match self {
            AdventureError::SessionFetch(e)
            | AdventureError::Start(e)
            | AdventureError::Retry(e)
            | AdventureError::Submit(e)
            | AdventureError::Complete(e)
            | AdventureError::Skip(e)
            | AdventureError::PostcardLookup(e) => e,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.request(), RequestError::Unauthorized)
    }
}

/// Remote adventure endpoints. Every call is authenticated by the
/// implementation; callers only pass identifiers and payloads.
#[async_trait]
pub trait AdventureApi: Send + Sync {
    async fn acquire_session(&self, diary_id: u64) -> Result<BattleSession, AdventureError>;

    async fn start_session(&self, session_id: u64) -> Result<BattleSession, AdventureError>;

    async fn retry_session(&self, session_id: u64) -> Result<BattleSession, AdventureError>;

    async fn submit_answer(
        &self,
        session_id: u64,
        submission: &AnswerSubmission,
    ) -> Result<TurnResult, AdventureError>;

    async fn complete_session(
        &self,
        session_id: u64,
        report: &CompletionReport,
    ) -> Result<Rewards, AdventureError>;

    async fn skip_session(&self, session_id: u64) -> Result<(), AdventureError>;

    /// Postcard generated for a diary entry, if any.
    async fn postcard_for_diary(&self, diary_id: u64) -> Result<Option<u64>, AdventureError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Extracts the `error` string from a JSON error body, falling back to the
/// status text.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}
