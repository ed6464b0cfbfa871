//! Multi-user task list service: the HTTP API, its Postgres store and a
//! command-line client for it.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod tasks;
#[cfg(test)]
mod testing;
