use std::sync::Arc;
use mongodb::Database;

use crate::config::AppConfig;
use crate::engine::scheduler::SchedulerStatusHandle;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub scheduler: SchedulerStatusHandle,
}

impl AppState {
    pub fn new(db: Database, config: Arc<AppConfig>, scheduler: SchedulerStatusHandle) -> Self {
        AppState {
            db,
            config,
            scheduler,
        }
    }
}
