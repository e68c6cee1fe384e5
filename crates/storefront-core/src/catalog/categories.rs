use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiError, Gateway, ImageUpload};
use crate::models::{ApiResponse, Category, CategoryInput};
use crate::services::CategoriesService;
use crate::state::{OperationState, StateCell};

pub const CATEGORY_CREATED: &str = "Category created successfully";
pub const CATEGORY_UPDATED: &str = "Category updated successfully";
pub const CATEGORY_DELETED: &str = "Category deleted successfully";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySnapshot {
    pub categories: Vec<Category>,
    pub current_category: Option<Category>,
    pub loading: bool,
    pub error: Option<ApiError>,
    /// Confirmation of the last successful write
    pub success: Option<String>,
}

impl CategorySnapshot {
    pub fn active_categories(&self) -> Vec<&Category> {
        self.categories.iter().filter(|c| c.is_active).collect()
    }

    pub fn category_by_id(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id() == id)
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.slug.as_deref() == Some(slug))
    }
}

impl OperationState for CategorySnapshot {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: Option<ApiError>) {
        self.error = error;
    }
}

pub struct CategoryManager {
    service: CategoriesService,
    state: StateCell<CategorySnapshot>,
}

impl CategoryManager {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            service: CategoriesService::new(gateway),
            state: StateCell::new(CategorySnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> CategorySnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<CategorySnapshot> {
        self.state.subscribe()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state.read(|s| s.categories.clone())
    }

    pub fn active_categories(&self) -> Vec<Category> {
        self.state
            .read(|s| s.active_categories().into_iter().cloned().collect())
    }

    pub fn category_by_id(&self, id: &str) -> Option<Category> {
        self.state.read(|s| s.category_by_id(id).cloned())
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.state.read(|s| s.category_by_slug(slug).cloned())
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        let _loading = self.state.begin();
        let result = self.service.list().await.and_then(ApiResponse::into_data);
        let categories = self.state.record(result)?;

        debug!(count = categories.len(), "Loaded categories");
        self.state.modify(|s| s.categories = categories.clone());
        Ok(categories)
    }

    pub async fn fetch_category_by_id(&self, id: &str) -> Result<Category, ApiError> {
        let _loading = self.state.begin();
        let result = self.service.get(id).await.and_then(ApiResponse::into_data);
        let category = self.state.record(result)?;

        self.state.modify(|s| s.current_category = Some(category.clone()));
        Ok(category)
    }

    pub async fn create_category(&self, input: &CategoryInput, image: Option<ImageUpload>) -> Result<Category, ApiError> {
        let _loading = self.begin_write();
        let result = self.service.create(input, image).await.and_then(ApiResponse::into_data);
        let category = self.state.record(result)?;

        self.state.modify(|s| {
            s.categories.push(category.clone());
            s.success = Some(CATEGORY_CREATED.to_string());
        });
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &CategoryInput,
        image: Option<ImageUpload>,
    ) -> Result<Category, ApiError> {
        let _loading = self.begin_write();
        let result = self
            .service
            .update(id, input, image)
            .await
            .and_then(ApiResponse::into_data);
        let category = self.state.record(result)?;

        self.state.modify(|s| {
            if let Some(entry) = s.categories.iter_mut().find(|c| c.id() == id) {
                *entry = category.clone();
            }
            s.success = Some(CATEGORY_UPDATED.to_string());
        });
        Ok(category)
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), ApiError> {
        let _loading = self.begin_write();
        let result = self.service.delete(id).await.map(|_| ());
        self.state.record(result)?;

        self.state.modify(|s| {
            s.categories.retain(|c| c.id() != id);
            s.success = Some(CATEGORY_DELETED.to_string());
        });
        Ok(())
    }

    // Writes also drop the previous confirmation
    fn begin_write(&self) -> crate::state::LoadingGuard<'_, CategorySnapshot> {
        let guard = self.state.begin();
        self.state.modify(|s| s.success = None);
        guard
    }

    /// Clear both the error and the success message.
    pub fn clear_messages(&self) {
        self.state.modify(|s| {
            s.error = None;
            s.success = None;
        });
    }

    pub fn clear_current_category(&self) {
        self.state.modify(|s| s.current_category = None);
    }
}
