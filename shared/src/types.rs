//! Common types used across the platform

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Units of measure for stocked items
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    Kg,
    Gram,
    Tonne,
    Litre,
    Millilitre,
    Metre,
    #[default]
    Piece,
    Box,
    Roll,
    Sheet,
    Set,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kg => "kg",
            UnitOfMeasure::Gram => "gram",
            UnitOfMeasure::Tonne => "tonne",
            UnitOfMeasure::Litre => "litre",
            UnitOfMeasure::Millilitre => "millilitre",
            UnitOfMeasure::Metre => "metre",
            UnitOfMeasure::Piece => "piece",
            UnitOfMeasure::Box => "box",
            UnitOfMeasure::Roll => "roll",
            UnitOfMeasure::Sheet => "sheet",
            UnitOfMeasure::Set => "set",
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 100;

    /// Page size clamped to 1..=MAX_PER_PAGE
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    /// Row offset for the requested page (pages are 1-based)
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        let total_pages = total_items.div_ceil(u64::from(per_page)) as u32;
        Self {
            page: pagination.page.max(1),
            per_page,
            total_items,
            total_pages,
        }
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination, total_items: u64) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(pagination, total_items),
        }
    }
}

/// Inclusive date range for analytics queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` days ending on `today`, inclusive
    pub fn last_days(days: i64, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(days.max(1) - 1),
            end: today,
        }
    }

    /// Build a range from optional bounds, defaulting to the last 30 days
    pub fn from_bounds(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, &'static str> {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or_else(|| Self::last_days(30, end).start);
        if start > end {
            return Err("Start date must not be after end date");
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parse a "YYYY-MM" month into the first day of that month
pub fn parse_month(month: &str) -> Option<NaiveDate> {
    let (year, month) = month.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// First day of the month containing `date` and first day of the following month
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let next = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    (start, next.unwrap_or(start))
}

/// Format a month start date back to "YYYY-MM"
pub fn format_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_pagination_offsets() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let zero = Pagination { page: 0, per_page: 0 };
        assert_eq!(zero.limit(), 1);
        assert_eq!(zero.offset(), 0);

        let huge = Pagination { page: 1, per_page: 10_000 };
        assert_eq!(huge.limit(), 100);
    }

    #[test]
    fn test_pagination_meta_total_pages() {
        let p = Pagination { page: 1, per_page: 20 };
        assert_eq!(PaginationMeta::new(&p, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(&p, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(&p, 21).total_pages, 2);
    }

    #[test]
    fn test_date_range_defaults_to_last_30_days() {
        let today = date(2026, 3, 31);
        let range = DateRange::from_bounds(None, None, today).unwrap();
        assert_eq!(range.end, today);
        assert_eq!(range.start, date(2026, 3, 2));
        assert_eq!(range.days(), 30);
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let today = date(2026, 3, 31);
        assert!(DateRange::from_bounds(Some(date(2026, 4, 1)), Some(today), today).is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2026-02"), Some(date(2026, 2, 1)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("26-02"), None);
        assert_eq!(parse_month("february"), None);
    }

    #[test]
    fn test_month_bounds_wraps_year() {
        assert_eq!(month_bounds(date(2025, 12, 15)), (date(2025, 12, 1), date(2026, 1, 1)));
        assert_eq!(month_bounds(date(2026, 2, 28)), (date(2026, 2, 1), date(2026, 3, 1)));
        assert_eq!(format_month(date(2026, 2, 1)), "2026-02");
    }

    proptest::proptest! {
        #[test]
        fn prop_pages_cover_every_item(total in 0u64..5_000, per_page in 0u32..150) {
            let first = Pagination { page: 1, per_page };
            let meta = PaginationMeta::new(&first, total);
            let covered = u64::from(meta.total_pages) * u64::from(meta.per_page);
            proptest::prop_assert!(covered >= total);
            proptest::prop_assert!(covered < total + u64::from(meta.per_page));
        }

        #[test]
        fn prop_month_round_trip(year in 1900i32..2200, month in 1u32..=12, day in 1u32..=28) {
            let (start, next) = month_bounds(date(year, month, day));
            proptest::prop_assert_eq!(parse_month(&format_month(start)), Some(start));
            proptest::prop_assert!(next > start);
            proptest::prop_assert_eq!(start.day(), 1);
        }
    }
}
