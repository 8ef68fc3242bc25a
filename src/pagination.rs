//! This module defines the common functionality for paging data.

use serde::Deserialize;

/// The config for pagination.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The records to return per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
        }
    }
}

/// Pagination parameters as they appear in requests.
///
/// Pages are 1-indexed.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PageQuery {
    /// The 1-indexed page number.
    pub page: Option<u64>,
    /// The number of records per page.
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Resolve the request parameters against the configured defaults,
    /// clamping nonsense values (page 0, page size 0) to usable ones.
    pub fn resolve(self, config: &PaginationConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(config.default_page).max(1);
        let per_page = self.per_page.unwrap_or(config.default_page_size).max(1);

        (page, per_page)
    }
}

/// The total number of pages needed to show `total` records.
///
/// Always at least 1, even when `total` is 0, so clients can render a pager
/// for an empty result set.
pub fn page_count(total: u64, per_page: u64) -> u64 {
    if total == 0 {
        1
    } else {
        total.div_ceil(per_page)
    }
}

/// Return the slice of `records` that belongs on the 1-indexed `page`.
pub fn paginate<T>(records: Vec<T>, page: u64, per_page: u64) -> Vec<T> {
    let start = (page.saturating_sub(1) * per_page) as usize;

    records
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect()
}

#[cfg(test)]
mod pagination_tests {
    use super::{PageQuery, PaginationConfig, page_count, paginate};

    #[test]
    fn page_count_is_one_for_empty_set() {
        assert_eq!(page_count(0, 20), 1);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(47, 20), 3);
        assert_eq!(page_count(40, 20), 2);
        assert_eq!(page_count(1, 20), 1);
    }

    #[test]
    fn pages_cover_all_records_without_overlap() {
        let records: Vec<u64> = (0..47).collect();
        let per_page = 20;

        let page_1 = paginate(records.clone(), 1, per_page);
        let page_2 = paginate(records.clone(), 2, per_page);
        let page_3 = paginate(records.clone(), 3, per_page);

        assert_eq!(page_1.len(), 20);
        assert_eq!(page_2.len(), 20);
        assert_eq!(page_3.len(), 7);

        let mut combined = [page_1, page_2, page_3].concat();
        combined.sort();
        assert_eq!(combined, records);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let records: Vec<u64> = (0..5).collect();

        assert!(paginate(records, 3, 20).is_empty());
    }

    #[test]
    fn resolve_clamps_zero_values() {
        let config = PaginationConfig::default();
        let query = PageQuery {
            page: Some(0),
            per_page: Some(0),
        };

        assert_eq!(query.resolve(&config), (1, 1));
    }
}
