//! # Engines
//!
//! Business operations on top of the store.
//!
//! - [`ContractEngine`] - contract creation, values, lifecycle transitions, audit
//! - [`BlueprintService`] - blueprint CRUD with the field-freeze rule
//! - [`seed`] - sample data
//!
//! Engines borrow a [`Database`](crate::storage::Database) for the length of
//! one operation and hold no state between calls.

mod blueprint;
mod contract;
mod error;
mod seed;

pub use blueprint::BlueprintService;
pub use contract::ContractEngine;
pub use error::{EngineError, EngineResult};
pub use seed::{seed, SeedSummary};
