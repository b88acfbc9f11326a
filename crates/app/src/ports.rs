//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod capabilities;
pub mod clock;
pub mod event_bus;
pub mod scheduler;
pub mod state_store;

pub use capabilities::{Capabilities, Listener, Subscription};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event_bus::EventPublisher;
pub use scheduler::{ManualScheduler, Scheduler, TimerCallback, TimerHandle, TokioScheduler};
pub use state_store::{ROUTINES_KEY, STATES_KEY, StateStore};
