//! Application state.

use std::sync::Arc;

use mediaq_provider::{HttpProviderClient, ProviderAdapter};
use mediaq_reconciler::{pipeline_from_config, ExtractionPipeline, ExtractionTrigger, ReconcilerConfig, ReconciliationPoller};
use mediaq_store::{MemoryQueueStore, QueueStore};

use crate::config::ApiConfig;
use crate::services::QueueAdmin;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn QueueStore>,
    pub poller: Arc<ReconciliationPoller>,
    pub queue_admin: QueueAdmin,
}

impl AppState {
    /// Wire state from explicit parts.
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn QueueStore>,
        provider: Arc<dyn ProviderAdapter>,
        pipeline: Arc<dyn ExtractionPipeline>,
        reconciler: ReconcilerConfig,
    ) -> Self {
        let trigger = ExtractionTrigger::new(Arc::clone(&store), pipeline);
        let poller = ReconciliationPoller::new(Arc::clone(&store), provider, trigger.clone(), reconciler);
        let queue_admin = QueueAdmin::new(Arc::clone(&store), trigger, config.default_max_retries);

        Self {
            config,
            store,
            poller: Arc::new(poller),
            queue_admin,
        }
    }

    /// Build state from environment variables.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let reconciler = ReconcilerConfig::from_env();
        let provider = HttpProviderClient::from_env()?;
        let pipeline = pipeline_from_config(&reconciler)?;
        let store: Arc<dyn QueueStore> = Arc::new(MemoryQueueStore::new());

        Ok(Self::new(config, store, Arc::new(provider), pipeline, reconciler))
    }
}
