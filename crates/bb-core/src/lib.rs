//! Core domain + application logic for the card balance bot.
//!
//! This crate is intentionally framework-agnostic. Telegram, the card account
//! service and credential persistence live behind ports (traits) implemented in
//! adapter crates or in `store`.

pub mod account;
pub mod command;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messages;
pub mod messaging;
pub mod orchestrator;
pub mod store;
pub mod workers;

pub use errors::{Error, Result};
