use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier, e.g. `"products.write"`.
///
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
    pub const PRODUCTS_WRITE: Permission = Permission::from_static("products.write");
    pub const SUPPLIERS_READ: Permission = Permission::from_static("suppliers.read");
    pub const SUPPLIERS_WRITE: Permission = Permission::from_static("suppliers.write");
    pub const EMPLOYEES_READ: Permission = Permission::from_static("employees.read");
    pub const EMPLOYEES_WRITE: Permission = Permission::from_static("employees.write");
    pub const GOODS_RECEIVES_READ: Permission = Permission::from_static("goods_receives.read");
    pub const GOODS_RECEIVES_WRITE: Permission = Permission::from_static("goods_receives.write");
    pub const STOCK_OUTS_READ: Permission = Permission::from_static("stock_outs.read");
    pub const STOCK_OUTS_WRITE: Permission = Permission::from_static("stock_outs.write");
    pub const STOCK_OUTS_DELETE: Permission = Permission::from_static("stock_outs.delete");
    pub const ORDERS_READ: Permission = Permission::from_static("orders.read");
    pub const ORDERS_WRITE: Permission = Permission::from_static("orders.write");
    pub const EXPENSES_READ: Permission = Permission::from_static("expenses.read");
    pub const EXPENSES_WRITE: Permission = Permission::from_static("expenses.write");
    pub const DASHBOARD_READ: Permission = Permission::from_static("dashboard.read");
    pub const REPORTS_READ: Permission = Permission::from_static("reports.read");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Part before the first dot (`"products"` for `"products.write"`).
    pub fn area(&self) -> &str {
        self.as_str().split('.').next().unwrap_or_default()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
