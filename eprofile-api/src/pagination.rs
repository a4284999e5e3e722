/// Page-number pagination
///
/// `page` starts at 1 and defaults to 1; `per_page` defaults to 20 and is
/// capped at 100. Out-of-range values are rejected rather than clamped.

use crate::error::{ApiError, ValidationErrorDetail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl PageParams {
    pub fn resolve(self) -> Result<Page, ApiError> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);

        let mut details = Vec::new();
        if page < 1 {
            details.push(ValidationErrorDetail::new("page", "page must be at least 1"));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            details.push(ValidationErrorDetail::new(
                "per_page",
                format!("per_page must be between 1 and {}", MAX_PER_PAGE),
            ));
        }

        if details.is_empty() {
            Ok(Page { page, per_page })
        } else {
            Err(ApiError::ValidationError(details))
        }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

/// Paginated response envelope
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            items,
            page: page.page,
            per_page: page.per_page,
            total,
            total_pages: total_pages(total, page.per_page),
        }
    }
}

/// `ceil(total / per_page)`
pub fn total_pages(total: i64, per_page: u32) -> i64 {
    let per_page = per_page.max(1) as i64;
    (total.max(0) + per_page - 1) / per_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PageParams::default().resolve().unwrap();
        assert_eq!(page, Page { page: 1, per_page: 20 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let page = PageParams {
            page: Some(3),
            per_page: Some(25),
        }
        .resolve()
        .unwrap();

        assert_eq!(page.offset(), 50);
        assert_eq!(page.limit(), 25);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(PageParams { page: Some(0), per_page: None }.resolve().is_err());
        assert!(PageParams { page: None, per_page: Some(0) }.resolve().is_err());
        assert!(PageParams { page: None, per_page: Some(101) }.resolve().is_err());
        assert!(PageParams { page: None, per_page: Some(100) }.resolve().is_ok());
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }
}
