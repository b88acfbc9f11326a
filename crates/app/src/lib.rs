//! # routines-app
//!
//! Application layer: the routine engine and its **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Capabilities`: read, change and watch the desktop
//!   - `StateStore`: persist JSON documents by key
//!   - `EventPublisher`: fan engine events out
//!   - `Clock` and `Scheduler`: time, injectable for tests
//! - Turn routine configuration into live **triggers** and **actions**
//! - Run the `RoutineEngine`: ALL/ANY matching, activation and deactivation
//!   protocols, first-write-wins state capture, the runaway-evaluation
//!   circuit breaker
//! - Provide **in-process infrastructure** (event channel, event bus,
//!   evaluation driver) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `routines-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action;
pub mod channel;
pub mod circuit_breaker;
pub mod engine;
pub mod event_bus;
pub mod ports;
pub mod state_manager;
pub mod trigger;

#[cfg(test)]
mod testing;
