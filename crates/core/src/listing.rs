//! Pagination, search and sort parameters shared by every list endpoint.
//!
//! Sorting is restricted to per-entity whitelists (`SortField` enums) so that
//! storage backends only ever see known column names.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{DomainError, DomainResult};

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(DomainError::validation("direction", "must be one of: asc, desc")),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Whitelisted sort key for one entity.
pub trait SortField: Copy + Default + core::fmt::Debug + Send + Sync + 'static {
    /// All accepted public names, used in error messages.
    const NAMES: &'static [&'static str];

    /// Parse the public name accepted in `?sort=`.
    fn parse(name: &str) -> Option<Self>;

    /// Column used in `ORDER BY`.
    fn column(self) -> &'static str;

    fn default_direction(self) -> SortDirection {
        SortDirection::Asc
    }
}

/// Validated list parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery<S: SortField> {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub sort: S,
    pub direction: SortDirection,
}

impl<S: SortField> Default for ListQuery<S> {
    fn default() -> Self {
        let sort = S::default();
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            search: None,
            sort,
            direction: sort.default_direction(),
        }
    }
}

impl<S: SortField> ListQuery<S> {
    /// Build from raw request parameters.
    pub fn from_params(
        page: Option<u32>,
        per_page: Option<u32>,
        search: Option<String>,
        sort: Option<&str>,
        direction: Option<&str>,
    ) -> DomainResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(DomainError::validation("page", "must be at least 1"));
        }

        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(DomainError::validation(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }

        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => S::parse(name).ok_or_else(|| {
                DomainError::validation("sort", format!("must be one of: {}", S::NAMES.join(", ")))
            })?,
            None => S::default(),
        };

        let direction = match direction.map(str::trim).filter(|s| !s.is_empty()) {
            Some(d) => SortDirection::parse(d)?,
            None => sort.default_direction(),
        };

        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            page,
            per_page,
            search,
            sort,
            direction,
        })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// `%term%` pattern for `ILIKE`, with wildcard characters escaped.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    /// Case-insensitive substring match of the search term against any field.
    ///
    /// Always true when no search term is set.
    pub fn matches(&self, fields: &[&str]) -> bool {
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                fields.iter().any(|f| f.to_lowercase().contains(&term))
            }
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new<S: SortField>(items: Vec<T>, total: u64, query: &ListQuery<S>) -> Self {
        let per_page = u64::from(query.per_page);
        Self {
            items,
            total,
            page: query.page,
            per_page: query.per_page,
            total_pages: total.div_ceil(per_page),
        }
    }

    /// Slice an already filtered and sorted collection.
    pub fn paginate<S: SortField>(all: Vec<T>, query: &ListQuery<S>) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Self::new(items, total, query)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Inclusive calendar date range; either bound may be open.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> DomainResult<Self> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(DomainError::validation("from", "must not be after 'to'"));
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|f| date >= f) && self.to.is_none_or(|t| date <= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    enum TestSort {
        #[default]
        Name,
        CreatedAt,
    }

    impl SortField for TestSort {
        const NAMES: &'static [&'static str] = &["name", "created_at"];

        fn parse(name: &str) -> Option<Self> {
            match name {
                "name" => Some(TestSort::Name),
                "created_at" => Some(TestSort::CreatedAt),
                _ => None,
            }
        }

        fn column(self) -> &'static str {
            match self {
                TestSort::Name => "name",
                TestSort::CreatedAt => "created_at",
            }
        }

        fn default_direction(self) -> SortDirection {
            match self {
                TestSort::Name => SortDirection::Asc,
                TestSort::CreatedAt => SortDirection::Desc,
            }
        }
    }

    #[test]
    fn defaults_apply_when_params_missing() {
        let q = ListQuery::<TestSort>::from_params(None, None, None, None, None).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, DEFAULT_PER_PAGE);
        assert_eq!(q.sort, TestSort::Name);
        assert_eq!(q.direction, SortDirection::Asc);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn sort_field_drives_default_direction() {
        let q = ListQuery::<TestSort>::from_params(None, None, None, Some("created_at"), None).unwrap();
        assert_eq!(q.direction, SortDirection::Desc);
    }

    #[test]
    fn unknown_sort_is_rejected() {
        let err = ListQuery::<TestSort>::from_params(None, None, None, Some("password"), None)
            .unwrap_err();
        assert!(err.to_string().contains("name, created_at"));
    }

    #[test]
    fn per_page_is_bounded() {
        assert!(ListQuery::<TestSort>::from_params(None, Some(0), None, None, None).is_err());
        assert!(ListQuery::<TestSort>::from_params(None, Some(101), None, None, None).is_err());
        assert!(ListQuery::<TestSort>::from_params(Some(0), None, None, None, None).is_err());
    }

    #[test]
    fn blank_search_is_ignored() {
        let q = ListQuery::<TestSort>::from_params(None, None, Some("   ".into()), None, None).unwrap();
        assert_eq!(q.search, None);
        assert!(q.matches(&["anything"]));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let q = ListQuery::<TestSort>::from_params(None, None, Some("50%_off".into()), None, None)
            .unwrap();
        assert_eq!(q.like_pattern().unwrap(), "%50\\%\\_off%");
    }

    #[test]
    fn paginate_slices_and_counts_pages() {
        let q = ListQuery::<TestSort>::from_params(Some(2), Some(3), None, None, None).unwrap();
        let page = Page::paginate((1..=7).collect::<Vec<_>>(), &q);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let range = DateRange::new(Some(d("2024-01-01")), Some(d("2024-01-31"))).unwrap();
        assert!(range.contains(d("2024-01-01")));
        assert!(range.contains(d("2024-01-31")));
        assert!(!range.contains(d("2024-02-01")));
        assert!(DateRange::new(Some(d("2024-02-01")), Some(d("2024-01-01"))).is_err());
    }
}
