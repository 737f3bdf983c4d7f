use crate::config::Config;
use pigg_core::{
    chat_inquiry::ChatInquiryService, customer::CustomerService, login_log::LoginLogService,
    risk_profile::RiskProfileService, simulation_state::SimulationStateService, PiggResult,
    RecordStore, SqliteStore,
};
use std::sync::Arc;

/// Services shared by every handler. Built once at startup around one store.
pub struct AppState {
    pub simulation_states: SimulationStateService,
    pub customers: CustomerService,
    pub risk_profiles: RiskProfileService,
    pub login_logs: LoginLogService,
    pub chat_inquiries: ChatInquiryService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> SharedState {
        Arc::new(Self {
            simulation_states: SimulationStateService::new(store.clone()),
            customers: CustomerService::new(store.clone()),
            risk_profiles: RiskProfileService::new(store.clone()),
            login_logs: LoginLogService::new(store.clone()),
            chat_inquiries: ChatInquiryService::new(store),
        })
    }
}

/// Open and migrate the configured SQLite database. `:memory:` gets an
/// in-memory database shared by every pooled connection of the store.
pub fn open_store(config: &Config) -> PiggResult<Arc<dyn RecordStore>> {
    let store = if config.db == ":memory:" {
        SqliteStore::in_memory()?
    } else {
        SqliteStore::open(&config.db)?
    };
    store.migrate()?;
    Ok(Arc::new(store))
}
