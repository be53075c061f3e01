//! Offset/limit pagination shared by every list endpoint.

use serde::Serialize;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: i64,
    offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Counts reported alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_count: i64,
    pub has_more: bool,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    /// Build a page from optional query parameters.
    ///
    /// A missing limit becomes [`Self::DEFAULT_LIMIT`]; any limit is clamped to
    /// `1..=MAX_LIMIT`. A missing or negative offset becomes 0.
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.offset
    }

    /// `has_more` is true when rows remain past this page.
    #[must_use]
    pub const fn info(&self, total_count: i64) -> PageInfo {
        PageInfo {
            total_count,
            has_more: self.offset.saturating_add(self.limit) < total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = Page::default();
        assert_eq!(page.limit(), 50);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Page::new(Some(0), None).limit(), 1);
        assert_eq!(Page::new(Some(-5), None).limit(), 1);
        assert_eq!(Page::new(Some(10_000), None).limit(), 100);
        assert_eq!(Page::new(None, Some(-3)).offset(), 0);
    }

    #[test]
    fn test_has_more_boundary() {
        let page = Page::new(Some(10), Some(20));
        assert!(page.info(31).has_more);
        assert!(!page.info(30).has_more);
        assert!(!page.info(0).has_more);
    }

    #[test]
    fn test_has_more_matches_definition_for_all_small_inputs() {
        for total in 0..40 {
            for limit in 1..12 {
                for offset in 0..40 {
                    let page = Page::new(Some(limit), Some(offset));
                    let info = page.info(total);
                    assert_eq!(info.has_more, offset + limit < total);

                    // A page never returns more rows than remain.
                    let returned = (total - offset).clamp(0, limit);
                    assert!(offset + returned <= total || returned == 0);
                }
            }
        }
    }

    #[test]
    fn test_info_serializes_camel_case() {
        let json = serde_json::to_value(Page::default().info(3)).unwrap_or_default();
        assert_eq!(json["totalCount"], 3);
        assert_eq!(json["hasMore"], false);
    }
}
