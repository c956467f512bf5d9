use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;
use wasmgate::InvocationEngine;

use crate::{config::ServerConfig, modules::ModuleStore};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InvocationEngine>,
    pub modules: Arc<ModuleStore>,
    /// Absent when no recorder is installed, e.g. in tests.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: &ServerConfig, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let engine = InvocationEngine::new(config.engine)?;
        let modules = ModuleStore::new(&config.module_dir);
        info!(
            module_dir = %modules.root().display(),
            deadline = ?config.engine.default_deadline,
            "serving modules"
        );
        Ok(Self {
            engine: Arc::new(engine),
            modules: Arc::new(modules),
            metrics,
        })
    }
}
