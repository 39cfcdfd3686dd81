//! Core modules shared by every Charter subsystem: the store handle, the
//! SQLite broker, configuration, the clock seam and the error taxonomy.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod schemas;
pub mod store;
pub mod time;
