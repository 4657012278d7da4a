use std::time::Duration;

use mart_core::ConfigSnapshot;

use crate::janitor::CleanupPolicy;
use crate::normalize::MAX_AVATARS;

/// Tunables for [`CatalogService`](crate::CatalogService).
///
/// Keys (all optional):
/// - `catalog.max_avatars` (default 3, clamped to `1..=3`)
/// - `catalog.upsert_attempts` (default 3)
/// - `cleanup.max_attempts` (default 3)
/// - `cleanup.backoff_ms` (default 200)
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub max_avatars: usize,
    pub upsert_attempts: usize,
    pub cleanup: CleanupPolicy,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            max_avatars: 3,
            upsert_attempts: 3,
            cleanup: CleanupPolicy::default(),
        }
    }
}

impl CatalogSettings {
    pub fn from_config(cfg: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_avatars: cfg
                .get_usize("catalog.max_avatars")
                .filter(|n| *n > 0)
                .map_or(defaults.max_avatars, |n| n.min(MAX_AVATARS)),
            upsert_attempts: cfg
                .get_usize("catalog.upsert_attempts")
                .unwrap_or(defaults.upsert_attempts)
                .max(1),
            cleanup: CleanupPolicy::new(
                cfg.get_usize("cleanup.max_attempts")
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                    .unwrap_or(defaults.cleanup.max_attempts),
                cfg.get_u64("cleanup.backoff_ms")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.cleanup.backoff),
            ),
        }
    }
}
