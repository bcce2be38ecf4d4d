use crate::error::StoreError;
use crate::models::{Ack, DeleteHistoryRequest, HistorySnapshot, ItemId, Mode, TallyState, VoteRequest};
use crate::store::VoteStore;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// [`VoteStore`] backed by the server's JSON API.
pub struct HttpStore {
    base_url: String,
    http: Client,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_vote(&self, request: &VoteRequest) -> Result<(), StoreError> {
        self.send_json(Method::POST, "/api/vote", request)
            .await?
            .json::<Ack>()
            .await?;
        Ok(())
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, StoreError> {
        let response = self.http.request(method, self.url(path)).json(body).send().await?;
        check(response).await
    }
}

// Turn a non-2xx response into an error carrying the server's message.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl VoteStore for HttpStore {
    async fn fetch_state(&self) -> Result<TallyState, StoreError> {
        let response = self.http.get(self.url("/api/vote")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn cast_vote(&self, user_id: &str, item_id: ItemId, user_name: &str) -> Result<(), StoreError> {
        self.post_vote(&VoteRequest::Vote {
            id: item_id,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        })
        .await
    }

    async fn retract_vote(&self, user_id: &str, item_id: ItemId) -> Result<(), StoreError> {
        self.post_vote(&VoteRequest::Unvote {
            id: item_id,
            user_id: user_id.to_string(),
        })
        .await
    }

    async fn set_mode(&self, mode: Mode) -> Result<(), StoreError> {
        self.post_vote(&VoteRequest::SetMode { mode }).await
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        self.post_vote(&VoteRequest::Reset).await
    }

    async fn relabel(&self, item_id: ItemId, label: &str) -> Result<(), StoreError> {
        self.post_vote(&VoteRequest::UpdateLabel {
            id: item_id,
            label: label.to_string(),
        })
        .await
    }

    async fn finalize_round(&self) -> Result<HistorySnapshot, StoreError> {
        let response = self.http.post(self.url("/api/history")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list_history(&self) -> Result<Vec<HistorySnapshot>, StoreError> {
        let response = self.http.get(self.url("/api/history")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete_history(&self, id: i64) -> Result<(), StoreError> {
        self.send_json(Method::DELETE, "/api/history", &DeleteHistoryRequest { id })
            .await?
            .json::<Ack>()
            .await?;
        Ok(())
    }
}
