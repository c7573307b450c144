//! Repository traits implemented by every storage backend.
//!
//! Multi-row operations (goods receive, stock out, order fulfilment and
//! their deletions) are all-or-nothing: on any error no row is changed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use stockroom_accounting::{Expense, ExpenseFilter, ExpenseSort, ExpenseSummary, UpdateExpense};
use stockroom_auth::{Employee, EmployeeFilter, EmployeeSort, UpdateEmployee};
use stockroom_core::{
    EmployeeId, ExpenseId, GoodsReceiveId, ListQuery, OrderId, Page, ProductId, StockOutId,
    SupplierId,
};
use stockroom_inventory::StockReportRow;
use stockroom_parties::{Supplier, SupplierSort, UpdateSupplier};
use stockroom_products::{Product, ProductFilter, ProductSort, UpdateProduct};
use stockroom_purchasing::{GoodsReceive, GoodsReceiveFilter, GoodsReceiveSort, NewGoodsReceive};
use stockroom_sales::{
    NewOrder, NewStockOut, Order, OrderFilter, OrderSort, StockOut, StockOutFilter, StockOutSort,
};

use crate::error::StoreResult;
use crate::reports::{DashboardSummary, MonthSummary, TopProduct};

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fails with a conflict when the code is taken.
    async fn create_product(&self, product: Product) -> StoreResult<Product>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;
    async fn list_products(
        &self,
        query: &ListQuery<ProductSort>,
        filter: &ProductFilter,
    ) -> StoreResult<Page<Product>>;
    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product>;
    /// Returns the updated product and the image path it replaced.
    async fn set_product_image(
        &self,
        id: ProductId,
        image: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Product, Option<String>)>;
    /// Refused while any document line references the product.
    async fn delete_product(&self, id: ProductId) -> StoreResult<Product>;
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn create_supplier(&self, supplier: Supplier) -> StoreResult<Supplier>;
    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Supplier>;
    async fn list_suppliers(&self, query: &ListQuery<SupplierSort>) -> StoreResult<Page<Supplier>>;
    async fn update_supplier(&self, id: SupplierId, update: UpdateSupplier) -> StoreResult<Supplier>;
    /// Refused while a goods receive references the supplier.
    async fn delete_supplier(&self, id: SupplierId) -> StoreResult<()>;
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Fails with a conflict when the e-mail is taken.
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee>;
    async fn get_employee(&self, id: EmployeeId) -> StoreResult<Employee>;
    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>>;
    async fn list_employees(
        &self,
        query: &ListQuery<EmployeeSort>,
        filter: &EmployeeFilter,
    ) -> StoreResult<Page<Employee>>;
    async fn update_employee(
        &self,
        id: EmployeeId,
        update: UpdateEmployee,
        actor: EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee>;
    async fn set_employee_password(
        &self,
        id: EmployeeId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn delete_employee(&self, id: EmployeeId, actor: EmployeeId) -> StoreResult<()>;
    async fn count_employees(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait GoodsReceiveRepository: Send + Sync {
    /// Insert the document and its lines, raise stock and record each line's
    /// unit cost as the product's cost price.
    async fn create_goods_receive(
        &self,
        input: NewGoodsReceive,
        received_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<GoodsReceive>;
    async fn get_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<GoodsReceive>;
    async fn list_goods_receives(
        &self,
        query: &ListQuery<GoodsReceiveSort>,
        filter: &GoodsReceiveFilter,
    ) -> StoreResult<Page<GoodsReceive>>;
    /// Remove the document and take its quantities back out of stock.
    async fn delete_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<()>;
}

#[async_trait]
pub trait StockOutRepository: Send + Sync {
    /// Insert the document and its lines and lower stock; fails with
    /// `InsufficientStock` without writing anything when any product is short.
    async fn create_stock_out(
        &self,
        input: NewStockOut,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<StockOut>;
    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOut>;
    async fn list_stock_outs(
        &self,
        query: &ListQuery<StockOutSort>,
        filter: &StockOutFilter,
    ) -> StoreResult<Page<StockOut>>;
    /// Remove the document and put its quantities back. Refused for stock
    /// outs that fulfilled an order.
    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(
        &self,
        input: NewOrder,
        created_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<Order>;
    async fn get_order(&self, id: OrderId) -> StoreResult<Order>;
    async fn list_orders(
        &self,
        query: &ListQuery<OrderSort>,
        filter: &OrderFilter,
    ) -> StoreResult<Page<Order>>;
    /// Issue the order's lines as a stock out and mark it fulfilled, atomically.
    async fn fulfill_order(
        &self,
        id: OrderId,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Order, StockOut)>;
    async fn cancel_order(&self, id: OrderId, now: DateTime<Utc>) -> StoreResult<Order>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create_expense(&self, expense: Expense) -> StoreResult<Expense>;
    async fn get_expense(&self, id: ExpenseId) -> StoreResult<Expense>;
    async fn list_expenses(
        &self,
        query: &ListQuery<ExpenseSort>,
        filter: &ExpenseFilter,
    ) -> StoreResult<Page<Expense>>;
    async fn update_expense(&self, id: ExpenseId, update: UpdateExpense) -> StoreResult<Expense>;
    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()>;
    async fn expense_summary(&self, filter: &ExpenseFilter) -> StoreResult<ExpenseSummary>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn dashboard_summary(&self, today: NaiveDate) -> StoreResult<DashboardSummary>;
    /// `months` months ending with the month of `today`, oldest first.
    async fn monthly_chart(&self, today: NaiveDate, months: u32) -> StoreResult<Vec<MonthSummary>>;
    /// Products ranked by quantity issued through stock outs.
    async fn top_products(&self, limit: u32) -> StoreResult<Vec<TopProduct>>;
    async fn stock_rows(&self) -> StoreResult<Vec<StockReportRow>>;
}

/// Everything the API needs from storage.
pub trait Store:
    ProductRepository
    + SupplierRepository
    + EmployeeRepository
    + GoodsReceiveRepository
    + StockOutRepository
    + OrderRepository
    + ExpenseRepository
    + ReportRepository
{
}

impl<T> Store for T where
    T: ProductRepository
        + SupplierRepository
        + EmployeeRepository
        + GoodsReceiveRepository
        + StockOutRepository
        + OrderRepository
        + ExpenseRepository
        + ReportRepository
{
}
