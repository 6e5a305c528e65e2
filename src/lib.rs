//! # Courtyard Community Console Library
//!
//! Core functionality for the courtyard community console: tenant
//! resolution, role-gated handlers, content configuration and the carousel
//! playback engine.

pub mod auth;
pub mod carousel;
pub mod config;
pub mod content;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod import;
pub mod models;
pub mod repositories;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod tenancy;
pub use migration;
