use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{ApiError, Gateway, ImageUpload, RequestEnvelope};
use crate::models::{ApiResponse, Product, ProductInput, ProductQuery};

/// Calls under `/products`.
#[derive(Clone)]
pub struct ProductsService {
    gateway: Arc<Gateway>,
}

impl ProductsService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// `GET /products` with pagination, filters and sorting
    pub async fn list(&self, query: &ProductQuery) -> Result<ApiResponse<Vec<Product>>, ApiError> {
        let envelope = RequestEnvelope::get(&["products"]).with_query(query.to_pairs());
        self.gateway.send(envelope).await
    }

    /// `GET /products/:id`
    pub async fn get(&self, id: &str) -> Result<ApiResponse<Product>, ApiError> {
        self.gateway.send(RequestEnvelope::get(&["products", id])).await
    }

    /// `POST /products`, multipart when an image is attached
    pub async fn create(&self, input: &ProductInput, image: Option<ImageUpload>) -> Result<ApiResponse<Product>, ApiError> {
        debug!(with_image = image.is_some(), "Creating product");
        let envelope = RequestEnvelope::post(&["products"]).with_upload(input, image)?;
        self.gateway.send(envelope).await
    }

    /// `PUT /products/:id`, multipart when an image is attached.
    ///
    /// The answer is kept as raw fields so callers can tell what it left out.
    pub async fn update(
        &self,
        id: &str,
        input: &ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<ApiResponse<Map<String, Value>>, ApiError> {
        debug!(id = id, with_image = image.is_some(), "Updating product");
        let envelope = RequestEnvelope::put(&["products", id]).with_upload(input, image)?;
        self.gateway.send(envelope).await
    }

    /// `DELETE /products/:id`
    pub async fn delete(&self, id: &str) -> Result<ApiResponse<Value>, ApiError> {
        self.gateway.send(RequestEnvelope::delete(&["products", id])).await
    }

    /// `GET /products/search?q=`
    pub async fn search(&self, text: &str) -> Result<ApiResponse<Vec<Product>>, ApiError> {
        let envelope = RequestEnvelope::get(&["products", "search"]).with_query([("q", text)]);
        self.gateway.send(envelope).await
    }

    /// `GET /products/category/:id` with optional pagination
    pub async fn by_category(
        &self,
        category_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ApiResponse<Vec<Product>>, ApiError> {
        let query = ProductQuery {
            page,
            limit,
            ..Default::default()
        };
        let envelope =
            RequestEnvelope::get(&["products", "category", category_id]).with_query(query.to_pairs());
        self.gateway.send(envelope).await
    }
}
