use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A catalog product as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    object_id: Option<String>,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    virtual_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    pub fn id(&self) -> &str {
        resolve_id(&self.object_id, &self.virtual_id)
    }

    pub fn in_stock(&self) -> bool {
        self.stock.map(|s| s > 0).unwrap_or(false)
    }

    /// Overlay the keys present in `changes`, keeping everything it leaves out.
    pub fn merge(&mut self, changes: &Map<String, Value>) -> serde_json::Result<()> {
        let mut fields = match serde_json::to_value(&*self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        *self = serde_json::from_value(Value::Object(fields))?;
        Ok(())
    }
}

/// Product category: a bare id, or the populated category document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(String),
    Populated {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        object_id: Option<String>,
        #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
        virtual_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Populated {
                object_id,
                virtual_id,
                ..
            } => resolve_id(object_id, virtual_id),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryRef::Populated { name: Some(name), .. } => name,
            _ => self.id(),
        }
    }
}

/// Document stores send `_id`, and `id` too when virtuals are on. `_id` wins.
pub(crate) fn resolve_id<'a>(object_id: &'a Option<String>, virtual_id: &'a Option<String>) -> &'a str {
    object_id
        .as_deref()
        .or(virtual_id.as_deref())
        .unwrap_or_default()
}

/// Fields sent when creating or updating a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{}', expected asc or desc", other)),
        }
    }
}

/// Catalog filters that persist between list fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ProductFilters {
    /// Fields set in `changes` win; everything else is kept from `self`.
    pub fn overlay(&self, changes: &ProductFilters) -> ProductFilters {
        ProductFilters {
            search: changes.search.clone().or_else(|| self.search.clone()),
            category: changes.category.clone().or_else(|| self.category.clone()),
            min_price: changes.min_price.or(self.min_price),
            max_price: changes.max_price.or(self.max_price),
            in_stock: changes.in_stock.or(self.in_stock),
            featured: changes.featured.or(self.featured),
            sort_by: changes.sort_by.clone().or_else(|| self.sort_by.clone()),
            sort_order: changes.sort_order.or(self.sort_order),
        }
    }
}

/// Parameters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub filters: ProductFilters,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.filters.category = Some(category.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.filters.search = Some(search.into());
        self
    }

    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.filters.min_price = min;
        self.filters.max_price = max;
        self
    }

    pub fn in_stock(mut self, in_stock: bool) -> Self {
        self.filters.in_stock = Some(in_stock);
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.filters.featured = Some(featured);
        self
    }

    pub fn sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.filters.sort_by = Some(sort_by.into());
        self.filters.sort_order = Some(order);
        self
    }

    /// Query pairs in canonical order. Absent and empty values are left out.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let f = &self.filters;
        let candidates = [
            ("page", self.page.map(|p| p.to_string())),
            ("limit", self.limit.map(|l| l.to_string())),
            ("category", non_empty(&f.category)),
            ("search", non_empty(&f.search)),
            ("minPrice", f.min_price.map(|p| p.to_string())),
            ("maxPrice", f.max_price.map(|p| p.to_string())),
            ("inStock", f.in_stock.map(|b| b.to_string())),
            ("featured", f.featured.map(|b| b.to_string())),
            ("sortBy", non_empty(&f.sort_by)),
            ("sortOrder", f.sort_order.map(|o| o.as_str().to_string())),
        ];
        candidates
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect()
    }

    /// Encoded query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }
}
