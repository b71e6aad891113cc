use adoption_params::workflows::answers::{MemoryAnswerStore, StoreError};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Raw CSV answer table for one response code, as posted to the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnswerUpload {
    pub(crate) response_code: String,
    pub(crate) csv: String,
}

pub(crate) fn answer_store(uploads: &[AnswerUpload]) -> Result<MemoryAnswerStore, StoreError> {
    let mut store = MemoryAnswerStore::new();
    for upload in uploads {
        store.insert_csv(upload.response_code.trim(), &upload.csv)?;
    }
    Ok(store)
}
