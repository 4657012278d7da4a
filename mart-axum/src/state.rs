use std::sync::Arc;

use mart_catalog::CatalogService;

use crate::middlewares::multipart::IntakeConfig;

/// Shared handler state.
#[derive(Clone)]
pub struct MartAxumState {
    pub catalog: CatalogService,
    pub intake: Arc<IntakeConfig>,
}

impl MartAxumState {
    pub fn new(catalog: CatalogService, intake: IntakeConfig) -> Self {
        Self {
            catalog,
            intake: Arc::new(intake),
        }
    }
}
