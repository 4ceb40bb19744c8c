//! Application state.

use std::sync::Arc;

use mp3ify_queue::{
    ConversionQueue, ExpiryIndex, JobProducer, JobStore, ProducerConfig, ProgressChannel,
};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<JobStore>,
    pub expiry: Arc<ExpiryIndex>,
    pub progress: Arc<ProgressChannel>,
    pub producer: Arc<JobProducer>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = JobStore::from_env()?;
        let queue = ConversionQueue::from_env()?;
        let expiry = ExpiryIndex::from_env()?;
        let progress = ProgressChannel::from_env()?;

        let producer_config = ProducerConfig {
            output_dir: config.storage_path.clone(),
            ..ProducerConfig::from_env()
        };
        let producer = JobProducer::new(store.clone(), queue, expiry.clone(), producer_config);

        Ok(Self {
            config,
            store: Arc::new(store),
            expiry: Arc::new(expiry),
            progress: Arc::new(progress),
            producer: Arc::new(producer),
        })
    }
}
