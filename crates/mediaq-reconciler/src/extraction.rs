//! Extraction trigger and pipeline clients.
//!
//! The trigger claims the extraction stage with a conditional store write
//! (`extraction_status` pending -> processing on a completed upload) and only
//! the caller whose write lands dispatches the pipeline. Concurrent callers
//! therefore fire at most once per item.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mediaq_models::{ExtractionStatus, QueueItemId, UploadStatus};
use mediaq_store::{ItemUpdate, Precondition, QueueStore};

use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::logging::ItemLogger;
use crate::metrics::record_extraction;

// =============================================================================
// Pipelines
// =============================================================================

/// Start contract of the downstream extraction pipeline.
///
/// The pipeline reports its own progress back through the store.
#[async_trait]
pub trait ExtractionPipeline: Send + Sync {
    async fn start(&self, item_id: &QueueItemId) -> ReconcileResult<()>;
}

#[derive(Debug, Serialize)]
struct StartRequest<'a> {
    item_id: &'a str,
}

/// Pipeline reached over HTTP: `POST {url}` with `{"item_id": ...}`.
#[derive(Clone)]
pub struct HttpExtractionPipeline {
    http: Client,
    url: String,
}

impl HttpExtractionPipeline {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ReconcileResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mediaq-reconciler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReconcileError::config_error(format!("extraction client: {}", e)))?;

        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl ExtractionPipeline for HttpExtractionPipeline {
    async fn start(&self, item_id: &QueueItemId) -> ReconcileResult<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&StartRequest {
                item_id: item_id.as_str(),
            })
            .send()
            .await
            .map_err(|e| ReconcileError::extraction(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReconcileError::extraction(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        Ok(())
    }
}

/// Pipeline stand-in used when no endpoint is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingExtractionPipeline;

#[async_trait]
impl ExtractionPipeline for LoggingExtractionPipeline {
    async fn start(&self, item_id: &QueueItemId) -> ReconcileResult<()> {
        info!(item_id = %item_id, "Extraction start requested (no pipeline configured)");
        Ok(())
    }
}

/// Build the pipeline described by the config.
pub fn pipeline_from_config(config: &ReconcilerConfig) -> ReconcileResult<Arc<dyn ExtractionPipeline>> {
    match &config.extraction_url {
        Some(url) => Ok(Arc::new(HttpExtractionPipeline::new(url.clone(), config.extraction_timeout)?)),
        None => Ok(Arc::new(LoggingExtractionPipeline)),
    }
}

// =============================================================================
// Trigger
// =============================================================================

/// Fires the extraction stage once per completed item.
#[derive(Clone)]
pub struct ExtractionTrigger {
    store: Arc<dyn QueueStore>,
    pipeline: Arc<dyn ExtractionPipeline>,
}

impl ExtractionTrigger {
    pub fn new(store: Arc<dyn QueueStore>, pipeline: Arc<dyn ExtractionPipeline>) -> Self {
        Self { store, pipeline }
    }

    /// The write that claims the stage.
    fn claim_update() -> ItemUpdate {
        ItemUpdate::new().extraction(ExtractionStatus::Processing, 0)
    }

    /// Precondition under which a claim is allowed.
    fn claim_precondition() -> Precondition {
        Precondition::upload_status(UploadStatus::Completed).and_extraction_status(ExtractionStatus::Pending)
    }

    /// Claim and dispatch the extraction stage for a completed item.
    ///
    /// Returns `Ok(true)` if this call fired the pipeline and `Ok(false)` if
    /// the item was not eligible (not completed, or already claimed). The
    /// claim is persisted before returning; the pipeline runs in the background.
    pub async fn start(&self, item_id: &QueueItemId) -> ReconcileResult<bool> {
        match self
            .store
            .update_fields(item_id, &Self::claim_precondition(), Self::claim_update())
            .await
        {
            Ok(_) => {
                self.dispatch(item_id.clone());
                Ok(true)
            }
            Err(e) if e.is_precondition_failed() => {
                debug!(item_id = %item_id, "Extraction not started: {}", e);
                record_extraction("skipped");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run the pipeline for an item whose claim has already been persisted.
    ///
    /// A failed start marks the stage failed so it is visible to operators.
    pub fn dispatch(&self, item_id: QueueItemId) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            let logger = ItemLogger::new(&item_id, "extraction");
            logger.log_start("dispatching extraction pipeline");

            match pipeline.start(&item_id).await {
                Ok(()) => {
                    record_extraction("dispatched");
                    logger.log_completion("extraction pipeline started");
                }
                Err(e) => {
                    record_extraction("failed");
                    logger.log_error(&format!("extraction pipeline start failed: {}", e));

                    let precondition = Precondition::upload_status(UploadStatus::Completed)
                        .and_extraction_status(ExtractionStatus::Processing);
                    let update = ItemUpdate::new().extraction(ExtractionStatus::Failed, 0);
                    if let Err(e) = store.update_fields(&item_id, &precondition, update).await {
                        warn!(item_id = %item_id, "Failed to record extraction failure: {}", e);
                    }
                }
            }
        })
    }
}
