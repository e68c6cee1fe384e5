//! REST plumbing for the storefront backend.
//!
//! This module provides the `Gateway`, the one place outgoing requests pass
//! through, together with the request envelope it consumes and the
//! normalized `ApiError` every call fails with.
//!
//! The backend authenticates with a bearer token obtained from
//! `/auth/login` or `/auth/register`.

pub mod envelope;
pub mod error;
pub mod gateway;

pub use envelope::{ImageUpload, Payload, RequestEnvelope};
pub use error::{ApiError, Failure};
pub use gateway::{Gateway, GatewayConfig, UnauthorizedListener, DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS};
