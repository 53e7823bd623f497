//! # SkuWatch Server
//!
//! HTTP surface for the SkuWatch classifier. The `skuwatch` binary wires
//! configuration, logging and the loaded artifact into [`server::router`].

pub mod server;

pub use server::{ApiError, AppState, router, run};
