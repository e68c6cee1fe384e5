use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{ApiError, Gateway, ImageUpload};
use crate::models::{ApiResponse, Pagination, Product, ProductFilters, ProductInput, ProductQuery};
use crate::services::ProductsService;
use crate::state::{OperationState, StateCell};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub current_product: Option<Product>,
    pub loading: bool,
    pub error: Option<ApiError>,
    pub pagination: Pagination,
    pub filters: ProductFilters,
}

impl OperationState for CatalogSnapshot {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: Option<ApiError>) {
        self.error = error;
    }
}

/// Product list, detail view and the filters that produced them.
pub struct ProductCatalog {
    service: ProductsService,
    state: StateCell<CatalogSnapshot>,
}

impl ProductCatalog {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            service: ProductsService::new(gateway),
            state: StateCell::new(CatalogSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogSnapshot> {
        self.state.subscribe()
    }

    pub fn products(&self) -> Vec<Product> {
        self.state.read(|s| s.products.clone())
    }

    pub fn current_product(&self) -> Option<Product> {
        self.state.read(|s| s.current_product.clone())
    }

    pub fn pagination(&self) -> Pagination {
        self.state.read(|s| s.pagination)
    }

    pub fn filters(&self) -> ProductFilters {
        self.state.read(|s| s.filters.clone())
    }

    /// List products using the stored filters with `params` laid over them.
    ///
    /// The combined filters are kept only when the fetch succeeds.
    pub async fn fetch_products(&self, params: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let _loading = self.state.begin();
        let result = self.load(params).await;
        self.state.record(result)
    }

    async fn load(&self, params: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let filters = self.filters().overlay(&params.filters);
        let query = ProductQuery {
            page: params.page,
            limit: params.limit,
            filters: filters.clone(),
        };

        let response = self.service.list(&query).await?;
        let pagination = response.pagination.unwrap_or_default();
        let products = response.into_data()?;
        debug!(count = products.len(), page = pagination.page, "Loaded products");

        self.state.modify(|s| {
            s.products = products.clone();
            s.pagination = pagination;
            s.filters = filters;
        });
        Ok(products)
    }

    pub async fn fetch_product_by_id(&self, id: &str) -> Result<Product, ApiError> {
        let _loading = self.state.begin();
        let result = self.load_one(id).await;
        self.state.record(result)
    }

    async fn load_one(&self, id: &str) -> Result<Product, ApiError> {
        let product = self.service.get(id).await?.into_data()?;
        self.state.modify(|s| s.current_product = Some(product.clone()));
        Ok(product)
    }

    /// Create a product, then reload the list with the current filters.
    ///
    /// A failed reload is logged; the product exists on the backend either way.
    pub async fn create_product(&self, input: &ProductInput, image: Option<ImageUpload>) -> Result<Product, ApiError> {
        let _loading = self.state.begin();
        let result = self.service.create(input, image).await.and_then(ApiResponse::into_data);
        let created = self.state.record(result)?;

        if let Err(e) = self.load(&ProductQuery::default()).await {
            warn!(error = %e, "Product created but the list could not be reloaded");
        }
        Ok(created)
    }

    /// Update a product and fold the answer into the detail view and the list.
    ///
    /// Fields the answer leaves out keep their current values.
    pub async fn update_product(
        &self,
        id: &str,
        input: &ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<Product, ApiError> {
        let _loading = self.state.begin();
        let result = self.apply_update(id, input, image).await;
        self.state.record(result)
    }

    async fn apply_update(&self, id: &str, input: &ProductInput, image: Option<ImageUpload>) -> Result<Product, ApiError> {
        let changes = self.service.update(id, input, image).await?.into_data()?;

        let (mut current, mut entry) = self.state.read(|s| {
            (
                s.current_product.clone().filter(|p| p.id() == id),
                s.products.iter().find(|p| p.id() == id).cloned(),
            )
        });
        for product in current.iter_mut().chain(entry.iter_mut()) {
            product.merge(&changes).map_err(merge_error)?;
        }

        let updated = match current.clone().or_else(|| entry.clone()) {
            Some(product) => product,
            None => serde_json::from_value(Value::Object(changes)).map_err(merge_error)?,
        };
        self.state.modify(|s| {
            if let Some(merged) = current {
                s.current_product = Some(merged);
            }
            if let (Some(merged), Some(slot)) = (entry, s.products.iter_mut().find(|p| p.id() == id)) {
                *slot = merged;
            }
        });
        Ok(updated)
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
        let _loading = self.state.begin();
        let result = self.service.delete(id).await.map(|_| ());
        self.state.record(result)?;

        self.state.modify(|s| {
            s.products.retain(|p| p.id() != id);
            if s.current_product.as_ref().is_some_and(|p| p.id() == id) {
                s.current_product = None;
            }
        });
        Ok(())
    }

    /// Full-text search. The text becomes the stored search filter.
    pub async fn search_products(&self, text: &str) -> Result<Vec<Product>, ApiError> {
        let _loading = self.state.begin();
        let result = self.service.search(text).await.and_then(ApiResponse::into_data);
        let products = self.state.record(result)?;

        self.state.modify(|s| {
            s.products = products.clone();
            s.filters.search = Some(text.to_string());
        });
        Ok(products)
    }

    pub async fn fetch_products_by_category(
        &self,
        category_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<Product>, ApiError> {
        let _loading = self.state.begin();
        let result = self.load_category(category_id, page, limit).await;
        self.state.record(result)
    }

    async fn load_category(
        &self,
        category_id: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<Product>, ApiError> {
        let response = self.service.by_category(category_id, page, limit).await?;
        let pagination = response.pagination.unwrap_or_default();
        let products = response.into_data()?;

        self.state.modify(|s| {
            s.products = products.clone();
            s.pagination = pagination;
            s.filters.category = Some(category_id.to_string());
        });
        Ok(products)
    }

    pub fn clear_filters(&self) {
        self.state.modify(|s| s.filters = ProductFilters::default());
    }

    pub fn clear_error(&self) {
        self.state.modify(|s| s.error = None);
    }

    pub fn clear_current_product(&self) {
        self.state.modify(|s| s.current_product = None);
    }
}

fn merge_error(err: serde_json::Error) -> ApiError {
    ApiError::Unexpected(format!("Invalid product in update response: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GatewayConfig;
    use crate::auth::CredentialStore;

    fn unreachable_catalog() -> ProductCatalog {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:1/api".to_string(),
            timeout_secs: 2,
        };
        let gateway = Gateway::new(&config, CredentialStore::in_memory()).unwrap();
        ProductCatalog::new(Arc::new(gateway))
    }

    #[test]
    fn test_initial_state() {
        let catalog = unreachable_catalog();
        let snapshot = catalog.snapshot();
        assert!(snapshot.products.is_empty());
        assert_eq!(snapshot.pagination, Pagination::default());
        assert_eq!(snapshot.filters, ProductFilters::default());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_filters_and_records_error() {
        let catalog = unreachable_catalog();
        let err = catalog
            .fetch_products(&ProductQuery::new().category("c1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), 0);

        let snapshot = catalog.snapshot();
        assert_eq!(snapshot.filters.category, None);
        assert_eq!(snapshot.error, Some(err));
        assert!(!snapshot.loading);

        catalog.clear_error();
        assert!(catalog.snapshot().error.is_none());
    }
}
