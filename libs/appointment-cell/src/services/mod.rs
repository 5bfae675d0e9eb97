pub mod coordinator;
pub mod lifecycle;

pub use coordinator::BookingCoordinator;
pub use lifecycle::BookingLifecycleService;
