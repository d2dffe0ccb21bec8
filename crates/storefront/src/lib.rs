//! Cake Shop Storefront library.
//!
//! The REST backend as a library, so the binary, the CLI and the tests share
//! one router, one set of repositories and one set of services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
