pub mod state;
pub mod store;
pub mod supabase;

pub use state::AppState;
pub use store::{with_timeout, BookingStore, ScheduleStore, StoreError};
