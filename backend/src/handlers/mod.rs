//! HTTP handlers, one module per resource family

pub mod auth;
pub mod chat;
pub mod company;
pub mod customer;
pub mod customer_insights;
pub mod finance;
pub mod health;
pub mod insights;
pub mod invoice;
pub mod machine;
pub mod manual_job;
pub mod order;
pub mod packaging;
pub mod plan;
pub mod product;
pub mod production;
pub mod raw_material;
pub mod reporting;
pub mod scrap_reason;
pub mod supplier;

pub use auth::*;
pub use chat::*;
pub use company::*;
pub use customer::*;
pub use customer_insights::*;
pub use finance::*;
pub use health::*;
pub use insights::*;
pub use invoice::*;
pub use machine::*;
pub use manual_job::*;
pub use order::*;
pub use packaging::*;
pub use plan::*;
pub use product::*;
pub use production::*;
pub use raw_material::*;
pub use reporting::*;
pub use scrap_reason::*;
pub use supplier::*;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::types::{month_bounds, parse_month, DateRange, Pagination};

use crate::error::{AppError, AppResult};

/// `?page=&per_page=&search=` on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        paginate(self.page, self.per_page)
    }

    /// Search term, ignoring blanks
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

pub(crate) fn paginate(page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let defaults = Pagination::default();
    Pagination {
        page: page.unwrap_or(defaults.page),
        per_page: per_page.unwrap_or(defaults.per_page),
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD&format=csv` on date-window analytics
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
}

impl RangeQuery {
    /// Requested window, defaulting to the last 30 days
    pub fn range(&self) -> AppResult<DateRange> {
        date_range(self.from, self.to)
    }

    pub fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

pub(crate) fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<DateRange> {
    DateRange::from_bounds(from, to, Utc::now().date_naive())
        .map_err(|message| AppError::validation("from", message))
}

/// `?month=YYYY-MM` on month-scoped endpoints
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
    pub product_id: Option<uuid::Uuid>,
}

impl MonthQuery {
    /// First day of the requested month, the current month when absent
    pub fn month(&self) -> AppResult<NaiveDate> {
        match self.month.as_deref() {
            Some(month) => month_start(month),
            None => Ok(month_bounds(Utc::now().date_naive()).0),
        }
    }
}

pub(crate) fn month_start(month: &str) -> AppResult<NaiveDate> {
    parse_month(month)
        .ok_or_else(|| AppError::validation("month", "Month must be in YYYY-MM format"))
}

/// Attachment response for `?format=csv` exports
pub(crate) fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let pagination = query.pagination();
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.per_page, 20);
        assert_eq!(query.search(), None);
    }

    #[test]
    fn test_range_query_rejects_inverted_window() {
        let query = RangeQuery {
            from: NaiveDate::from_ymd_opt(2026, 5, 2),
            to: NaiveDate::from_ymd_opt(2026, 5, 1),
            format: None,
        };
        assert!(matches!(query.range(), Err(AppError::Validation { .. })));

        let default = RangeQuery::default().range().unwrap();
        assert_eq!(default.days(), 30);
    }

    #[test]
    fn test_month_query() {
        let query = MonthQuery {
            month: Some("2026-02".to_string()),
            product_id: None,
        };
        assert_eq!(query.month().unwrap(), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

        let bad = MonthQuery {
            month: Some("Feb 2026".to_string()),
            product_id: None,
        };
        assert!(bad.month().is_err());
    }

    #[test]
    fn test_csv_response_headers() {
        let response = csv_response("oee.csv", "a,b\n".to_string());
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"oee.csv\""
        );
    }
}
