//! Request/response DTOs and query-string parsing.
//!
//! Query parameters are taken as strings and parsed here so malformed
//! values produce the regular JSON validation error instead of a plain-text
//! extractor rejection.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_accounting::ExpenseFilter;
use stockroom_auth::{Employee, EmployeeFilter, EmployeeStatus, Role};
use stockroom_core::{DateRange, DomainError, ListQuery, SortField, SupplierId};
use stockroom_inventory::StockStatus;
use stockroom_products::ProductFilter;
use stockroom_purchasing::GoodsReceiveFilter;
use stockroom_sales::{OrderFilter, OrderStatus, StockOutFilter};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
    /// Required when employees change their own password.
    #[serde(default)]
    pub current_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub employee: Employee,
}

// -------------------------
// Query parameters
// -------------------------

fn parse_u32(field: &'static str, raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| DomainError::validation(field, "must be a positive integer").into()),
    }
}

fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| DomainError::validation(field, "must be a date (YYYY-MM-DD)").into()),
    }
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a path identifier.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    Ok(raw.trim().parse::<T>()?)
}

/// `page`, `per_page`, `search`, `sort`, `direction`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListParams {
    pub fn query<S: SortField>(&self) -> Result<ListQuery<S>, ApiError> {
        Ok(ListQuery::from_params(
            parse_u32("page", self.page.as_deref())?,
            parse_u32("per_page", self.per_page.as_deref())?,
            self.search.clone(),
            self.sort.as_deref(),
            self.direction.as_deref(),
        )?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeParams {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::new(
            parse_date("from", self.from.as_deref())?,
            parse_date("to", self.to.as_deref())?,
        )?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductParams {
    pub category: Option<String>,
}

impl ProductParams {
    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: non_empty(&self.category).map(str::to_string),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeParams {
    pub role: Option<String>,
    pub status: Option<String>,
}

impl EmployeeParams {
    pub fn filter(&self) -> Result<EmployeeFilter, ApiError> {
        Ok(EmployeeFilter {
            role: non_empty(&self.role).map(Role::parse).transpose()?,
            status: non_empty(&self.status)
                .map(EmployeeStatus::parse)
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GoodsReceiveParams {
    pub supplier_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl GoodsReceiveParams {
    pub fn filter(&self) -> Result<GoodsReceiveFilter, ApiError> {
        Ok(GoodsReceiveFilter {
            supplier_id: non_empty(&self.supplier_id)
                .map(parse_id::<SupplierId>)
                .transpose()?,
            range: RangeParams {
                from: self.from.clone(),
                to: self.to.clone(),
            }
            .range()?,
        })
    }
}

impl RangeParams {
    pub fn stock_out_filter(&self) -> Result<StockOutFilter, ApiError> {
        Ok(StockOutFilter {
            range: self.range()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderParams {
    pub status: Option<String>,
}

impl OrderParams {
    pub fn filter(&self) -> Result<OrderFilter, ApiError> {
        Ok(OrderFilter {
            status: non_empty(&self.status).map(OrderStatus::parse).transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseParams {
    pub category: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ExpenseParams {
    pub fn filter(&self) -> Result<ExpenseFilter, ApiError> {
        Ok(ExpenseFilter {
            category: non_empty(&self.category).map(str::to_string),
            range: RangeParams {
                from: self.from.clone(),
                to: self.to.clone(),
            }
            .range()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockReportParams {
    pub status: Option<String>,
    pub search: Option<String>,
}

impl StockReportParams {
    pub fn status(&self) -> Result<Option<StockStatus>, ApiError> {
        Ok(non_empty(&self.status).map(StockStatus::parse).transpose()?)
    }

    pub fn search(&self) -> Option<String> {
        non_empty(&self.search).map(str::to_lowercase)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    pub months: Option<String>,
}

impl ChartParams {
    pub fn months(&self) -> Result<Option<u32>, ApiError> {
        parse_u32("months", self.months.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopProductsParams {
    pub limit: Option<String>,
}

impl TopProductsParams {
    pub fn limit(&self) -> Result<Option<u32>, ApiError> {
        parse_u32("limit", self.limit.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_products::ProductSort;

    #[test]
    fn list_params_parse_into_query() {
        let params = ListParams {
            page: Some("2".into()),
            per_page: Some("25".into()),
            search: Some(" tea ".into()),
            sort: Some("stock".into()),
            direction: Some("desc".into()),
        };
        let q = params.query::<ProductSort>().unwrap();
        assert_eq!(q.page, 2);
        assert_eq!(q.per_page, 25);
        assert_eq!(q.search.as_deref(), Some("tea"));
        assert_eq!(q.offset(), 25);
    }

    #[test]
    fn malformed_numbers_are_validation_errors() {
        let params = ListParams {
            page: Some("two".into()),
            ..Default::default()
        };
        assert!(params.query::<ProductSort>().is_err());
    }

    #[test]
    fn date_range_must_be_ordered() {
        let ok = RangeParams {
            from: Some("2024-01-01".into()),
            to: Some("2024-01-31".into()),
        };
        assert!(ok.range().is_ok());
        let bad = RangeParams {
            from: Some("2024-02-01".into()),
            to: Some("2024-01-01".into()),
        };
        assert!(bad.range().is_err());
        let garbled = RangeParams {
            from: Some("01/02/2024".into()),
            to: None,
        };
        assert!(garbled.range().is_err());
    }

    #[test]
    fn employee_filter_rejects_unknown_role() {
        let params = EmployeeParams {
            role: Some("owner".into()),
            status: None,
        };
        assert!(params.filter().is_err());
    }
}
