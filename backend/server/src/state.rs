use std::sync::Arc;

use reqwest::Client;

use super::{
    caption::{Captioner, InferenceCaptioner},
    config::Config,
    database::{ComplaintStore, RedisComplaints, init_redis},
    storage::{GcsBucket, ObjectStore},
};

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn ObjectStore>,
    /// `None` when captioning is switched off.
    pub captioner: Option<Arc<dyn Captioner>>,
    pub complaints: Arc<dyn ComplaintStore>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let client = Client::new();

        let complaints = RedisComplaints::new(init_redis(&config.redis_url).await?);
        let storage = GcsBucket::new(client.clone(), &config);
        let captioner = config
            .caption_api_key
            .clone()
            .filter(|_| config.caption_enabled)
            .map(|api_key| {
                Arc::new(InferenceCaptioner::new(
                    client,
                    config.caption_api_url.clone(),
                    api_key,
                )) as Arc<dyn Captioner>
            });

        Ok(Self::with_gateways(
            config,
            Arc::new(storage),
            captioner,
            Arc::new(complaints),
        ))
    }

    pub fn with_gateways(
        config: Config,
        storage: Arc<dyn ObjectStore>,
        captioner: Option<Arc<dyn Captioner>>,
        complaints: Arc<dyn ComplaintStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            storage,
            captioner,
            complaints,
        })
    }
}
