//! # routines-domain
//!
//! Pure domain model for the routines automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Routines** (a match policy over triggers bound to ordered actions)
//! - Define **Trigger** and **Action** configuration, parsed into typed specs
//!   through closed construction tables
//! - Define the **captured state** map used to revert actions exactly
//! - Define **health records**, engine **events**, and the
//!   import/export **transfer** document
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod captured_state;
pub mod desktop;
pub mod evaluation;
pub mod event;
pub mod health;
pub mod routine;
pub mod transfer;
