//! mart-axum: the HTTP boundary of campus-mart.
//!
//! Builds the Axum router over a [`mart_catalog::CatalogService`], turns
//! multipart listing forms into catalog requests and maps every error onto the
//! JSON error body. The `campus-mart` binary wires it to configuration.

pub mod app;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;
pub use error::MartAxumError;
pub use state::MartAxumState;

pub use app::{build, MartApp};
