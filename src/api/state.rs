use std::sync::Arc;

use crate::config::Config;
use crate::handlers::HandlerRegistry;
use crate::observability::Metrics;
use crate::pipeline::ProcessPipeline;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: RecordStore,
    pub pipeline: ProcessPipeline,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, registry: HandlerRegistry, store: RecordStore) -> Self {
        let metrics = Arc::new(Metrics::new());
        let pipeline = ProcessPipeline::new(
            Arc::new(registry),
            config.views.clone(),
            config.pagination.clone(),
            Arc::clone(&metrics),
        );
        Self {
            config: Arc::new(config),
            store,
            pipeline,
            metrics,
        }
    }
}
