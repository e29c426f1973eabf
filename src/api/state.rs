use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::observability::Metrics;
use crate::queue::JobBroker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Ledger>,
    pub tokens: Arc<TokenService>,
    pub broker: Arc<JobBroker>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Ledger,
        tokens: TokenService,
        broker: Arc<JobBroker>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            tokens: Arc::new(tokens),
            broker,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
