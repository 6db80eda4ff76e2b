use crate::config::Config;
use crate::emitter::EventBus;
use crate::entity_store::MongoStore;
use crate::project_lifecycle::ProjectLifecycle;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MongoStore>,
    pub lifecycle: Arc<ProjectLifecycle<MongoStore>>,
    pub event_bus: Addr<EventBus>,
    pub config: Config,
}
