use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::api::models::{AskRequest, AskResult, RankingItem};
use crate::api::response::BaseResponse;
use crate::config::Config;
use crate::error::{AppError, Result};

/// The two calls the front end makes against the backend.
#[async_trait]
pub trait SphereApi: Send + Sync {
    /// `POST /ask`
    async fn ask(&self, request: &AskRequest) -> Result<BaseResponse<AskResult>>;

    /// `GET /ranking/top3`
    async fn top3_keywords(&self) -> Result<BaseResponse<Vec<RankingItem>>>;
}

pub struct HttpApiClient {
    base_url: String,
    client: Client,
}

impl HttpApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(HttpApiClient {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_ask(&self, request: &AskRequest) -> Result<BaseResponse<AskResult>> {
        let response = self
            .client
            .post(self.endpoint("/ask"))
            .json(request)
            .send()
            .await?;
        read_envelope(response).await
    }

    async fn get_top3(&self) -> Result<BaseResponse<Vec<RankingItem>>> {
        let response = self.client.get(self.endpoint("/ranking/top3")).send().await?;
        read_envelope(response).await
    }
}

#[async_trait]
impl SphereApi for HttpApiClient {
    async fn ask(&self, request: &AskRequest) -> Result<BaseResponse<AskResult>> {
        debug!(chars = request.content.chars().count(), "sending ask request");
        let result = self.post_ask(request).await;
        if let Err(err) = &result {
            error!(error = %err, "ask API call failed");
        }
        result
    }

    async fn top3_keywords(&self) -> Result<BaseResponse<Vec<RankingItem>>> {
        let result = self.get_top3().await;
        if let Err(err) = &result {
            error!(error = %err, "ranking API call failed");
        }
        result
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<BaseResponse<T>> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(AppError::HttpStatus {
            status: status.as_u16(),
            message: extract_message(&body),
        });
    }

    Ok(BaseResponse::from_body(&body)?)
}

/// Pulls a string `message` field out of an error body, if the body is JSON.
fn extract_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("message")
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
