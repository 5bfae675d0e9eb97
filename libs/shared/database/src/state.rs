use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::store::{
    BookingStore, InMemoryBookingStore, InMemoryScheduleStore, ScheduleStore,
    SupabaseBookingStore, SupabaseScheduleStore,
};
use crate::supabase::SupabaseClient;

/// Shared router state: configuration plus the two stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub schedules: Arc<dyn ScheduleStore>,
    pub bookings: Arc<dyn BookingStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        schedules: Arc<dyn ScheduleStore>,
        bookings: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            schedules,
            bookings,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(InMemoryBookingStore::new()),
        )
    }

    /// Builds the stores selected by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Self {
        match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-memory schedule and booking stores");
                Self::in_memory(config)
            }
            StoreBackend::Supabase => {
                info!("Using Supabase stores at {}", config.supabase_url);
                let client = Arc::new(SupabaseClient::new(&config));
                Self::new(
                    config,
                    Arc::new(SupabaseScheduleStore::new(client.clone())),
                    Arc::new(SupabaseBookingStore::new(client)),
                )
            }
        }
    }
}
