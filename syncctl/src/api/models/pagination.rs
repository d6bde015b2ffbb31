//! Page-based pagination for record listings.

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of records per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of records that can be requested per page.
pub const MAX_LIMIT: i64 = 1000;

/// `page` is 1-based; `limit` is clamped to `1..=MAX_LIMIT`.
///
/// Query strings arrive as text, hence `DisplayFromStr`; it also lets this struct be flattened
/// into other query structs.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, starting at 1 (default: 1)
    #[param(default = 1, minimum = 1)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub page: Option<i64>,

    /// Records per page (default: 10, max: 1000)
    #[param(default = 10, minimum = 1, maximum = 1000)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Number of records before the requested page.
    #[inline]
    pub fn skip(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Pagination {
        serde_urlencoded::from_str(query).unwrap()
    }

    #[test]
    fn test_defaults() {
        let p = parse("");
        assert_eq!((p.page(), p.limit(), p.skip()), (1, 10, 0));
    }

    #[test]
    fn test_second_page() {
        let p = parse("page=2&limit=5");
        assert_eq!(p.skip(), 5);
        assert_eq!(p.limit(), 5);
    }

    #[test]
    fn test_clamping() {
        let p = parse("page=0&limit=5000");
        assert_eq!((p.page(), p.limit()), (1, MAX_LIMIT));

        let p = parse("page=-3&limit=0");
        assert_eq!((p.page(), p.limit(), p.skip()), (1, 1, 0));
    }

    #[test]
    fn test_non_numeric_is_rejected() {
        assert!(serde_urlencoded::from_str::<Pagination>("page=two").is_err());
    }
}
