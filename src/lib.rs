pub mod api;
pub mod ask;
pub mod config;
pub mod error;
pub mod poller;
pub mod reveal;

use std::sync::Arc;
use api::HttpApiClient;
use ask::AskController;
use config::Config;
use error::Result;
use poller::KeywordPoller;

/// Everything the page owns: one API client shared by both flows.
pub struct AppState {
    pub config: Arc<Config>,
    pub ask: Arc<AskController<HttpApiClient>>,
    pub keywords: KeywordPoller<HttpApiClient>,
}

impl AppState {
    /// Builds both controllers. The poller is not started yet.
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(HttpApiClient::new(&config)?);
        let ask = AskController::new(api.clone(), config.fallback_error.clone());
        let keywords = KeywordPoller::new(api, config.poll_interval);

        Ok(AppState {
            config: Arc::new(config),
            ask: Arc::new(ask),
            keywords,
        })
    }
}
