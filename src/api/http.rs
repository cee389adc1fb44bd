use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::api::{
    error_message, AdventureApi, AdventureError, AnswerSubmission, CompletionReport, RequestError,
};
use crate::session::{BattleSession, Rewards, TurnResult};

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

pub struct HttpAdventureApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct PostcardLookup {
    #[serde(default)]
    postcard: Option<PostcardRef>,
}

#[derive(Deserialize)]
struct PostcardRef {
    id: u64,
}

impl HttpAdventureApi {
    pub fn new(config: ApiConfig) -> Result<Self, RequestError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RequestError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RequestError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::Server {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout
            } else {
                RequestError::Decode(e.to_string())
            }
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        log::debug!("POST {path}");
        self.send(self.client.post(self.url(path))).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        log::debug!("POST {path} (json)");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        log::debug!("GET {path}");
        self.send(self.client.get(self.url(path))).await
    }
}

fn transport_error(error: reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::Timeout
    } else {
        RequestError::Transport(error.to_string())
    }
}

#[async_trait::async_trait]
impl AdventureApi for HttpAdventureApi {
    async fn acquire_session(&self, diary_id: u64) -> Result<BattleSession, AdventureError> {
        self.post(&format!("/api/adventure/session/{diary_id}"))
            .await
            .map_err(AdventureError::SessionFetch)
    }

    async fn start_session(&self, session_id: u64) -> Result<BattleSession, AdventureError> {
        self.post(&format!("/api/adventure/{session_id}/start"))
            .await
            .map_err(AdventureError::Start)
    }

    async fn retry_session(&self, session_id: u64) -> Result<BattleSession, AdventureError> {
        self.post(&format!("/api/adventure/{session_id}/retry"))
            .await
            .map_err(AdventureError::Retry)
    }

    async fn submit_answer(
        &self,
        session_id: u64,
        submission: &AnswerSubmission,
    ) -> Result<TurnResult, AdventureError> {
        self.post_json(&format!("/api/adventure/{session_id}/submit"), submission)
            .await
            .map_err(AdventureError::Submit)
    }

    async fn complete_session(
        &self,
        session_id: u64,
        report: &CompletionReport,
    ) -> Result<Rewards, AdventureError> {
        self.post_json(&format!("/api/adventure/{session_id}/complete"), report)
            .await
            .map_err(AdventureError::Complete)
    }

    async fn skip_session(&self, session_id: u64) -> Result<(), AdventureError> {
        self.post::<IgnoredAny>(&format!("/api/adventure/{session_id}/skip"))
            .await
            .map(|_| ())
            .map_err(AdventureError::Skip)
    }

    async fn postcard_for_diary(&self, diary_id: u64) -> Result<Option<u64>, AdventureError> {
        let lookup: PostcardLookup = self
            .get(&format!("/api/postcard/by-diary/{diary_id}"))
            .await
            .map_err(AdventureError::PostcardLookup)?;
        Ok(lookup.postcard.map(|postcard| postcard.id))
    }
}
