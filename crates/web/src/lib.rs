//! Snippetbox web application library.
//!
//! The binary in `main.rs` wires configuration, logging and the database
//! to the router built here; tests drive the same router over in-memory
//! stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod views;
