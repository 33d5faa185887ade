use std::sync::Arc;

use crate::api::ApiClient;
use crate::common::LiveFeed;
use crate::config::Config;

/// Everything the dashboard tasks share, passed explicitly.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api_client: Arc<ApiClient>,
    pub live_feed: LiveFeed,
}

impl AppState {
    pub fn new(config: Config, api_client: ApiClient) -> Self {
        let live_feed = LiveFeed::new(config.live_buffer_capacity);

        Self {
            config: Arc::new(config),
            api_client: Arc::new(api_client),
            live_feed,
        }
    }
}
