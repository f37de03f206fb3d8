//! Application state shared across routes

use std::sync::Arc;

use tracing::{info, warn};

use crate::combat::CombatService;
use crate::config::{Config, StoreBackend};
use crate::dice::DiceRoller;
use crate::realtime::{LogPublisher, Publisher, SupabaseRealtime};
use crate::store::{CombatStore, MemoryStore, SupabaseClient, SupabaseCombatStore};
use crate::util::rate_limit::{create_user_limiter, UserLimiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub combats: Arc<CombatService>,
    pub dice: Arc<DiceRoller>,
    pub mutation_limiter: Arc<UserLimiter>,
    /// True when events go to Supabase Realtime rather than the log
    pub realtime_enabled: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // Initialize Supabase client when the project is configured
        let supabase = config.supabase.as_ref().map(SupabaseClient::new);

        let store: Arc<dyn CombatStore> = match (config.store_backend, supabase.clone()) {
            (StoreBackend::Supabase, Some(client)) => Arc::new(SupabaseCombatStore::new(client)),
            (StoreBackend::Supabase, None) => {
                warn!("Supabase backend selected without credentials, using memory store");
                Arc::new(MemoryStore::new())
            }
            (StoreBackend::Memory, _) => Arc::new(MemoryStore::new()),
        };

        let publisher: Arc<dyn Publisher> = match supabase {
            Some(client) if config.realtime_enabled => Arc::new(SupabaseRealtime::new(client)),
            _ => {
                info!("Realtime publishing disabled, combat events go to the log");
                Arc::new(LogPublisher)
            }
        };

        Self::from_parts(config, store, publisher)
    }

    /// Assemble state around an explicit store and publisher
    pub fn from_parts(
        config: Config,
        store: Arc<dyn CombatStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let config = Arc::new(config);
        let realtime_enabled = config.realtime_enabled && config.supabase.is_some();

        let dice = Arc::new(DiceRoller::new(config.dice_seed));
        let combats = Arc::new(CombatService::new(
            store,
            publisher,
            dice.clone(),
            config.gm_only_turn_advance,
        ));
        let mutation_limiter = create_user_limiter(config.mutation_rate_limit);

        Self {
            config,
            combats,
            dice,
            mutation_limiter,
            realtime_enabled,
        }
    }
}
