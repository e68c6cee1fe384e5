//! Data models for storefront entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserProfile` and the auth request/response payloads
//! - `Product`, `ProductInput`, and the typed `ProductQuery`/`ProductFilters`
//! - `Category` and `CategoryInput`
//! - `ApiResponse` and `Pagination`: the common response envelope

pub mod category;
pub mod product;
pub mod response;
pub mod user;

pub use category::{Category, CategoryInput};
pub use product::{CategoryRef, Product, ProductFilters, ProductInput, ProductQuery, SortOrder};
pub use response::{ApiResponse, Pagination};
pub use user::{AuthPayload, LoginRequest, ProfileUpdate, RegisterRequest, UserProfile};
