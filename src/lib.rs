//! Accord - blueprint-driven contract management
//!
//! Blueprints are reusable contract templates made of typed fields.
//! Contracts are instantiated from a blueprint, filled in, and moved through
//! a fixed approval lifecycle (`CREATED -> APPROVED -> SENT -> SIGNED ->
//! LOCKED`, with `REVOKED` reachable until signing). Every status change is
//! written to an append-only audit log.
//!
//! - [`domain`] - models and rules, no I/O
//! - [`engine`] - Contract Engine and Blueprint Service
//! - [`storage`] - SQLite store, project layout, configuration
//! - [`api`] - REST envelope, router and HTTP server
//! - [`cli`] - the `accord` command

pub mod api;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod storage;

pub use domain::{Blueprint, Contract, ContractStatus, Lifecycle};
