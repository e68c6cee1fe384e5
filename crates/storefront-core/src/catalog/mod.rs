//! Observable containers over the catalog endpoints.

pub mod categories;
pub mod products;

pub use categories::{CategoryManager, CategorySnapshot};
pub use products::{CatalogSnapshot, ProductCatalog};
