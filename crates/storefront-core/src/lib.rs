//! Client core for the storefront REST backend.
//!
//! Everything a front-end needs to talk to the backend lives here: the
//! request gateway that attaches credentials and normalizes failures, the
//! durable credential store, the observable session, and the catalog
//! containers for products and categories.
//!
//! Start with [`Storefront`], which wires those pieces around one shared
//! gateway.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use api::{ApiError, Failure, Gateway, GatewayConfig, ImageUpload};
pub use auth::{CredentialStore, SessionEvent, SessionSnapshot, SessionState};
pub use catalog::{CategoryManager, ProductCatalog};
pub use client::Storefront;
pub use config::Config;
pub use routes::{Navigation, Route};
