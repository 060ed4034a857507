//! Backend runtime entry point and public API surface.
//!
//! This crate owns the backend lifecycle, routes bridge messages to services,
//! and hosts the in-process data platform: the notifications table and the
//! change feed its inserts are published to.

mod app;
mod config;
mod realtime;
mod runtime;
mod services;
mod state;
mod store;

pub use crate::realtime::LocalChangeFeed;
pub use crate::runtime::run;
