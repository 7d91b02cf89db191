//! Core of the calbridge ecosystem.
//!
//! This crate holds everything that decides which host events belong to a source:
//! - `tag` for the `[SRC: …]` / `[ICSUID: …]` provenance markers
//! - `locator`, `upsert` and `reconcile` for the create and remove passes
//! - `host` for the port the passes drive, with an in-memory implementation
//! - `remote` for the JSON protocol spoken to provider binaries

pub mod config;
pub mod constants;
pub mod error;
pub mod host;
pub mod ics;
pub mod locator;
pub mod reconcile;
pub mod record;
pub mod remote;
pub mod report;
pub mod tag;
pub mod timestamp;
pub mod upsert;
pub mod window;
