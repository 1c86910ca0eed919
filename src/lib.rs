//! # Fangate API Library
//!
//! Core functionality for the Fangate service: gated download pages whose
//! file links are released only after a visitor completes the gate's
//! configured SoundCloud actions.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod gate_access;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod soundcloud;
pub mod telemetry;
pub use migration;
