//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{EvictionService, ExpirySweeper, LinkPolicy, LinkService};
use crate::config::Config;
use crate::domain::repositories::LinkRepository;
use crate::domain::time::TimeSource;
use crate::infrastructure::Store;
use crate::utils::code_generator::CodeGenerator;

pub type AppLinkService = LinkService<dyn LinkRepository>;
pub type AppExpirySweeper = ExpirySweeper<dyn LinkRepository>;

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<AppLinkService>,
    pub sweeper: Arc<AppExpirySweeper>,
    pub store: Store,
}

impl AppState {
    /// Wires the services over one store.
    ///
    /// The link service and the sweeper share a single eviction service, so
    /// both enforcement paths delete and audit the same way.
    pub fn new(store: Store, config: &Config, clock: Arc<dyn TimeSource>) -> Self {
        let eviction = Arc::new(EvictionService::new(store.links.clone()));

        let policy = LinkPolicy {
            default_ttl: config.default_ttl(),
            default_domain_prefix: config.base_url.clone(),
            max_code_attempts: config.code_max_attempts,
        };

        let link_service = Arc::new(LinkService::new(
            store.links.clone(),
            eviction.clone(),
            CodeGenerator::new(config.code_generator_seed),
            clock.clone(),
            policy,
        ));

        let sweeper = Arc::new(ExpirySweeper::new(
            store.links.clone(),
            eviction,
            clock,
            config.sweep_retry_attempts,
        ));

        Self {
            link_service,
            sweeper,
            store,
        }
    }
}
