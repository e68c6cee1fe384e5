//! Plain-text rendering of catalog data for the terminal.

use storefront_core::models::{Category, Pagination, Product, UserProfile};
use storefront_core::utils::{format_date, format_optional, format_price, format_stock, truncate_string};

const NAME_WIDTH: usize = 32;
const DESCRIPTION_WIDTH: usize = 60;

pub fn product_line(product: &Product) -> String {
    format!(
        "{:<26} {:<width$} {:>10}  {}",
        product.id(),
        truncate_string(&product.name, NAME_WIDTH),
        format_price(product.price),
        format_stock(product.stock),
        width = NAME_WIDTH,
    )
}

pub fn product_detail(product: &Product) -> String {
    let mut lines = vec![
        format!("{} ({})", product.name, product.id()),
        format!("  Price:     {}", format_price(product.price)),
        format!("  Stock:     {}", format_stock(product.stock)),
    ];
    if let Some(category) = &product.category {
        lines.push(format!("  Category:  {}", category.label()));
    }
    if product.featured {
        lines.push("  Featured".to_string());
    }
    if let Some(description) = &product.description {
        lines.push(format!("  {}", truncate_string(description, DESCRIPTION_WIDTH)));
    }
    if let Some(created) = &product.created_at {
        lines.push(format!("  Added:     {}", format_date(created)));
    }
    lines.join("\n")
}

pub fn pagination_footer(pagination: &Pagination) -> String {
    format!(
        "page {}/{} ({} products, {} per page)",
        pagination.page,
        pagination.pages.max(1),
        pagination.total,
        pagination.limit
    )
}

pub fn category_line(category: &Category) -> String {
    let marker = if category.is_active { " " } else { "x" };
    format!(
        "{} {:<26} {:<width$} {}",
        marker,
        category.id(),
        truncate_string(&category.name, NAME_WIDTH),
        format_optional(category.slug.as_deref(), "-"),
        width = NAME_WIDTH,
    )
}

pub fn category_detail(category: &Category) -> String {
    let mut lines = vec![
        format!("{} ({})", category.name, category.id()),
        format!("  Slug:      {}", format_optional(category.slug.as_deref(), "-")),
        format!("  Active:    {}", if category.is_active { "yes" } else { "no" }),
    ];
    if let Some(description) = &category.description {
        lines.push(format!("  {}", truncate_string(description, DESCRIPTION_WIDTH)));
    }
    lines.join("\n")
}

pub fn user_summary(user: &UserProfile) -> String {
    format!(
        "{} <{}> role: {}",
        user.display_name(),
        format_optional(user.email(), "no email"),
        format_optional(user.role(), "unknown"),
    )
}
