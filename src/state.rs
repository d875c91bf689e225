//! Estado compartido de la aplicación

use std::sync::Arc;

use crate::config::EnvironmentConfig;
use crate::repositories::FleetStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FleetStore>,
    pub config: EnvironmentConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn FleetStore>, config: EnvironmentConfig) -> Self {
        Self { store, config }
    }
}
