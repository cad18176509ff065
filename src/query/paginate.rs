// Copyright 2023 Remi Bernotavicius

use super::filter::coerce_number;
use crate::error::{Error, Result};
use serde::Serialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_ITEMS_PER_PAGE: i64 = 10;

/// Which slice of the matching recipes to return. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    items_per_page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, items_per_page: i64) -> Result<Self> {
        if page < 1 {
            return Err(invalid("page", page));
        }
        if items_per_page < 1 {
            return Err(invalid("itemsPerPage", items_per_page));
        }
        // the offset has to be representable
        if (page - 1).checked_mul(items_per_page).is_none() {
            return Err(invalid("page", page));
        }
        Ok(Self {
            page,
            items_per_page,
        })
    }

    /// Absent values fall back to the defaults, present ones must be whole numbers of at least 1.
    pub fn from_query(page: Option<&str>, items_per_page: Option<&str>) -> Result<Self> {
        let page = match page {
            Some(raw) => parse_count("page", raw)?,
            None => DEFAULT_PAGE,
        };
        let items_per_page = match items_per_page {
            Some(raw) => parse_count("itemsPerPage", raw)?,
            None => DEFAULT_ITEMS_PER_PAGE,
        };
        Self::new(page, items_per_page)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.items_per_page
    }

    pub fn limit(&self) -> i64 {
        self.items_per_page
    }

    pub fn pagination(&self, total_items: i64) -> Pagination {
        Pagination {
            page: self.page,
            items_per_page: self.items_per_page,
            total_items,
            total_pages: total_pages(total_items, self.items_per_page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub items_per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

fn total_pages(total_items: i64, items_per_page: i64) -> i64 {
    total_items / items_per_page + i64::from(total_items % items_per_page != 0)
}

// 2^63, the first whole number past `i64::MAX`. `i64::MAX as f64` rounds up to it.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn parse_count(field: &'static str, raw: &str) -> Result<i64> {
    let value = coerce_number(raw);
    if value.is_finite() && value.fract() == 0.0 && value >= 1.0 && value < I64_LIMIT {
        Ok(value as i64)
    } else {
        Err(invalid(field, raw))
    }
}

fn invalid(field: &'static str, value: impl ToString) -> Error {
    Error::InvalidPagination {
        field,
        value: value.to_string(),
    }
}

#[test]
fn defaults() {
    let request = PageRequest::from_query(None, None).unwrap();
    assert_eq!(request, PageRequest::default());
    assert_eq!(request.pagination(0).page, 1);
    assert_eq!(request.pagination(0).items_per_page, 10);
    assert_eq!(request.offset(), 0);
    assert_eq!(request.limit(), 10);
}

#[test]
fn window_arithmetic() {
    let request = PageRequest::from_query(Some("3"), Some(" 2 ")).unwrap();
    assert_eq!(request.offset(), 4);
    assert_eq!(request.limit(), 2);

    assert_eq!(
        request.pagination(5),
        Pagination {
            page: 3,
            items_per_page: 2,
            total_items: 5,
            total_pages: 3,
        }
    );
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(total_pages(0, 10), 0);
    assert_eq!(total_pages(1, 10), 1);
    assert_eq!(total_pages(10, 10), 1);
    assert_eq!(total_pages(11, 10), 2);
    assert_eq!(total_pages(5, 2), 3);
    assert_eq!(total_pages(4, 1), 4);
}

#[test]
fn invalid_input_is_an_error() {
    for (page, items_per_page) in [
        (Some("hello"), None),
        (Some("0"), None),
        (Some("-1"), None),
        (Some("1.5"), None),
        (Some(""), None),
        (None, Some("0")),
        (None, Some("ten")),
        (None, Some("Infinity")),
        (Some("9223372036854775808"), None),
        (None, Some("1e19")),
    ] {
        let error = PageRequest::from_query(page, items_per_page).unwrap_err();
        assert!(
            matches!(error, Error::InvalidPagination { .. }),
            "{page:?} {items_per_page:?}: {error}"
        );
    }

    assert!(PageRequest::new(i64::MAX, i64::MAX).is_err());
}

#[test]
fn pagination_serializes_camel_case() {
    let value = serde_json::to_value(PageRequest::default().pagination(0)).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "page": 1,
            "itemsPerPage": 10,
            "totalItems": 0,
            "totalPages": 0,
        })
    );
}
