//! Common types used across the platform

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    /// Zero-based offset of the first item on this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.per_page.max(1) as usize
    }

    /// Slice a fully materialised list down to the requested page
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let total_items = items.len() as u64;
        let per_page = self.per_page.max(1);
        let total_pages = ((total_items + per_page as u64 - 1) / per_page as u64) as u32;
        let data = items
            .into_iter()
            .skip(self.offset())
            .take(per_page as usize)
            .collect();

        PaginatedResponse {
            data,
            pagination: PaginationMeta {
                page: self.page.max(1),
                per_page,
                total_items,
                total_pages,
            },
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The last `days` calendar days ending on `end`, both bounds inclusive
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        let start = end - chrono::Duration::days(i64::from(days.max(1)) - 1);
        Self { start, end }
    }

    /// First to last day of a calendar month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = crate::ledger::month_end(year, month)?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// Returns true when both dates fall in the same calendar month
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_slices_items() {
        let page = Pagination {
            page: 2,
            per_page: 3,
        }
        .paginate((1..=8).collect::<Vec<_>>());

        assert_eq!(page.data, vec![4, 5, 6]);
        assert_eq!(page.pagination.total_items, 8);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn test_month_range_handles_leap_february() {
        let range = DateRange::month(2024, 2).unwrap();
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn test_trailing_days() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let range = DateRange::trailing_days(end, 30);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!((range.end - range.start).num_days() + 1, 30);
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));

        let single = DateRange::trailing_days(end, 1);
        assert_eq!(single.start, end);
    }

    #[test]
    fn test_zero_per_page_does_not_repeat_first_page() {
        let page = Pagination {
            page: 3,
            per_page: 0,
        }
        .paginate((1..=8).collect::<Vec<_>>());

        assert_eq!(page.data, vec![3]);
        assert_eq!(page.pagination.per_page, 1);
        assert_eq!(page.pagination.page, 3);
    }
}
