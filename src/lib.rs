//! # Backup Audit Library
//!
//! Core of the Backup Audit service: the entity store, evidence validation,
//! the shared validation filter engine, the dashboard aggregate, report
//! exports and the HTTP layer that serves them.

pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod evidence;
pub mod filters;
pub mod handlers;
pub mod models;
pub mod reports;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
