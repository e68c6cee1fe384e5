//! One method per backend operation, each mapped to exactly one HTTP call.
//!
//! Services hold no state: they build a `RequestEnvelope`, hand it to the
//! shared `Gateway`, and return the decoded envelope or the normalized error.

pub mod auth;
pub mod categories;
pub mod products;

pub use auth::AuthService;
pub use categories::CategoriesService;
pub use products::ProductsService;
