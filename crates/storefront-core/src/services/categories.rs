use std::sync::Arc;

use serde_json::Value;

use crate::api::{ApiError, Gateway, ImageUpload, RequestEnvelope};
use crate::models::{ApiResponse, Category, CategoryInput};

const CATEGORIES: &str = "categories";

/// Calls under `/categories`. Writes require an admin token.
#[derive(Clone)]
pub struct CategoriesService {
    gateway: Arc<Gateway>,
}

impl CategoriesService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<ApiResponse<Vec<Category>>, ApiError> {
        self.gateway.send(RequestEnvelope::get(&[CATEGORIES])).await
    }

    pub async fn get(&self, id: &str) -> Result<ApiResponse<Category>, ApiError> {
        self.gateway.send(RequestEnvelope::get(&[CATEGORIES, id])).await
    }

    pub async fn create(&self, input: &CategoryInput, image: Option<ImageUpload>) -> Result<ApiResponse<Category>, ApiError> {
        let envelope = RequestEnvelope::post(&[CATEGORIES]).with_upload(input, image)?;
        self.gateway.send(envelope).await
    }

    pub async fn update(
        &self,
        id: &str,
        input: &CategoryInput,
        image: Option<ImageUpload>,
    ) -> Result<ApiResponse<Category>, ApiError> {
        let envelope = RequestEnvelope::put(&[CATEGORIES, id]).with_upload(input, image)?;
        self.gateway.send(envelope).await
    }

    pub async fn delete(&self, id: &str) -> Result<ApiResponse<Value>, ApiError> {
        self.gateway.send(RequestEnvelope::delete(&[CATEGORIES, id])).await
    }
}
