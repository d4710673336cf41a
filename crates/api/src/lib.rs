//! HTTP API: the ingest surface, operator endpoints, and process wiring.

pub mod app;
pub mod config;
