use std::sync::Arc;

use crate::api::{ApiError, Gateway, RequestEnvelope};
use crate::models::{ApiResponse, AuthPayload, LoginRequest, ProfileUpdate, RegisterRequest, UserProfile};

/// Calls under `/auth`.
#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<Gateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiResponse<AuthPayload>, ApiError> {
        let envelope = RequestEnvelope::post(&["auth", "register"]).with_json(request)?;
        self.gateway.send(envelope).await
    }

    /// `POST /auth/login`
    pub async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<AuthPayload>, ApiError> {
        let envelope = RequestEnvelope::post(&["auth", "login"]).with_json(request)?;
        self.gateway.send(envelope).await
    }

    /// `GET /auth/profile`
    pub async fn profile(&self) -> Result<ApiResponse<UserProfile>, ApiError> {
        self.gateway.send(RequestEnvelope::get(&["auth", "profile"])).await
    }

    /// `PUT /auth/profile`
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<ApiResponse<UserProfile>, ApiError> {
        let envelope = RequestEnvelope::put(&["auth", "profile"]).with_json(update)?;
        self.gateway.send(envelope).await
    }
}
