/// Format a price with two decimals and a dollar sign
pub fn format_price(price: f64) -> String {
    if price < 0.0 {
        format!("-${:.2}", -price)
    } else {
        format!("${:.2}", price)
    }
}

/// Stock level for listings
pub fn format_stock(stock: Option<i64>) -> String {
    match stock {
        None => "-".to_string(),
        Some(n) if n <= 0 => "out of stock".to_string(),
        Some(n) => format!("{} in stock", n),
    }
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(59.9), "$59.90");
        assert_eq!(format_price(0.0), "$0.00");
        assert_eq!(format_price(-3.5), "-$3.50");
    }

    #[test]
    fn test_format_stock() {
        assert_eq!(format_stock(None), "-");
        assert_eq!(format_stock(Some(0)), "out of stock");
        assert_eq!(format_stock(Some(4)), "4 in stock");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Runner", 10), "Runner");
        assert_eq!(truncate_string("Trail Runner GTX", 8), "Trail...");
        assert_eq!(truncate_string("Zapatillas añejas", 12), "Zapatilla...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:00:00.000Z"), "Mar 05, 2024");
        assert_eq!(format_date("2024-03-05 10:00"), "2024-03-05");
        assert_eq!(format_date("soon"), "soon");
    }
}
