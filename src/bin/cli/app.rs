use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use cadence_lib::cache::MemoryCache;
use cadence_lib::clock::{Clock, SystemClock};
use cadence_lib::config::CadenceConfig;
use cadence_lib::scheduler::SchedulerService;
use cadence_lib::store::SqliteCardStore;

/// Shared application state for CLI commands
pub struct App {
    pub service: SchedulerService,
    clock: Arc<SystemClock>,
}

impl App {
    /// Load config, open the database and connect the cache
    pub async fn open(config_path: Option<&Path>, db_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => CadenceConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => {
                let data_dir = CadenceConfig::default_data_dir()
                    .context("Failed to get data directory")?;
                CadenceConfig::load(&data_dir.join("config.toml"))
                    .context("Failed to load config")?
            }
        };

        let db_path = match db_path {
            Some(path) => path.to_path_buf(),
            None => config
                .resolved_database_path()
                .context("Failed to resolve database path")?,
        };

        let store = SqliteCardStore::open(&db_path)
            .with_context(|| format!("Failed to open card database {}", db_path.display()))?;
        log::debug!("Using card database {}", db_path.display());

        let clock = Arc::new(SystemClock);
        let service = SchedulerService::new(
            Arc::new(store),
            Arc::new(MemoryCache::new()),
            clock.clone(),
            config,
        );

        // Due lists are read from the store when the cache is down
        if let Err(e) = service.connect().await {
            log::warn!("Cache unavailable: {}", e);
        }

        Ok(Self { service, clock })
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn close(&self) {
        if let Err(e) = self.service.close().await {
            log::warn!("Failed to close cache: {}", e);
        }
    }
}
