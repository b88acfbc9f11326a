//! # routines-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a JSON API over the [`RoutineEngine`](routines_app::engine::RoutineEngine):
//!   listing, adding and removing routines, reloading, forcing an evaluation,
//!   export and import
//! - Stream engine events to clients as Server-Sent Events
//! - Map [`RoutinesError`](routines_domain::error::RoutinesError) variants to
//!   HTTP status codes
//!
//! ## Dependency rule
//! Depends on `routines-app` (engine and port traits) and `routines-domain`
//! (types used in request/response mapping). Never leaks axum types into the
//! domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
