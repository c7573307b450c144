use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{instrument, warn};

use stockroom_accounting::{Expense, ExpenseFilter, ExpenseSort, ExpenseSummary, UpdateExpense};
use stockroom_auth::{Employee, EmployeeFilter, EmployeeSort, UpdateEmployee};
use stockroom_core::{
    DocumentKind, EmployeeId, Entity, ExpenseId, GoodsReceiveId, ListQuery, Money, OrderId, Page,
    ProductId, SortDirection, SortField, StockOutId, SupplierId,
};
use stockroom_inventory::{
    StockChange, StockError, StockReportRow, StockStatus, plan_issue, plan_receipt,
};
use stockroom_parties::{Supplier, SupplierSort, UpdateSupplier};
use stockroom_products::{Product, ProductFilter, ProductSort, UpdateProduct};
use stockroom_purchasing::{GoodsReceive, GoodsReceiveFilter, GoodsReceiveSort, NewGoodsReceive};
use stockroom_sales::{
    NewOrder, NewStockOut, Order, OrderFilter, OrderSort, OrderStatus, StockOut, StockOutFilter,
    StockOutSort,
};

use crate::error::{StoreError, StoreResult};
use crate::reports::{
    DashboardCounts, DashboardSummary, MonthSummary, MonthTotals, TopProduct, chart_months,
    month_start, monthly_series, rank_top_products,
};
use crate::store::{
    EmployeeRepository, ExpenseRepository, GoodsReceiveRepository, OrderRepository,
    ProductRepository, ReportRepository, StockOutRepository, SupplierRepository,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    suppliers: HashMap<SupplierId, Supplier>,
    employees: HashMap<EmployeeId, Employee>,
    goods_receives: HashMap<GoodsReceiveId, GoodsReceive>,
    stock_outs: HashMap<StockOutId, StockOut>,
    orders: HashMap<OrderId, Order>,
    expenses: HashMap<ExpenseId, Expense>,
    sequences: HashMap<(DocumentKind, NaiveDate), u32>,
}

/// A stock out that passed every check and only needs to be written.
struct PreparedStockOut {
    stock_out: StockOut,
    changes: Vec<StockChange>,
    sequence: u32,
}

impl State {
    fn stock_levels(&self) -> HashMap<ProductId, i64> {
        self.products.iter().map(|(id, p)| (*id, p.stock)).collect()
    }

    fn apply_changes(&mut self, changes: &[StockChange], now: DateTime<Utc>) {
        for change in changes {
            if let Some(p) = self.products.get_mut(&change.product_id) {
                p.stock = change.after;
                p.updated_at = now;
            }
        }
    }

    /// Next daily sequence for a document kind; recorded only on commit.
    fn next_sequence(&self, kind: DocumentKind, date: NaiveDate) -> u32 {
        self.sequences.get(&(kind, date)).copied().unwrap_or(0) + 1
    }

    fn product_referenced(&self, id: ProductId) -> bool {
        self.goods_receives.values().any(|d| d.contains_product(id))
            || self.stock_outs.values().any(|d| d.contains_product(id))
            || self.orders.values().any(|o| o.contains_product(id))
    }

    fn prepare_stock_out(
        &self,
        input: NewStockOut,
        issued_by: Option<EmployeeId>,
        order_id: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> StoreResult<PreparedStockOut> {
        let date = input.document_date(now);
        let sequence = self.next_sequence(DocumentKind::StockOut, date);
        let stock_out = StockOut::create(
            input,
            |id| self.products.get(&id).map(|p| p.sale_price),
            DocumentKind::StockOut.reference(date, sequence),
            issued_by,
            order_id,
            now,
        )?;
        let changes = plan_issue(&self.stock_levels(), &stock_out.stock_lines()).inspect_err(|e| {
            warn!(error = %e, "stock out rejected");
        })?;
        Ok(PreparedStockOut {
            stock_out,
            changes,
            sequence,
        })
    }

    fn commit_stock_out(&mut self, prepared: PreparedStockOut, now: DateTime<Utc>) -> StockOut {
        let PreparedStockOut {
            stock_out,
            changes,
            sequence,
        } = prepared;
        self.apply_changes(&changes, now);
        self.sequences
            .insert((DocumentKind::StockOut, stock_out.issued_on), sequence);
        self.stock_outs.insert(stock_out.id, stock_out.clone());
        stock_out
    }

    fn month_totals(&self, months: &[NaiveDate]) -> StoreResult<HashMap<NaiveDate, MonthTotals>> {
        let mut totals: HashMap<NaiveDate, MonthTotals> =
            months.iter().map(|m| (*m, MonthTotals::default())).collect();

        for gr in self.goods_receives.values() {
            if let Some(t) = totals.get_mut(&month_start(gr.received_on)) {
                t.purchases = t.purchases.checked_add(gr.total)?;
            }
        }
        for so in self.stock_outs.values() {
            if let Some(t) = totals.get_mut(&month_start(so.issued_on)) {
                t.sales = t.sales.checked_add(so.total)?;
            }
        }
        for e in self.expenses.values() {
            if let Some(t) = totals.get_mut(&month_start(e.spent_on)) {
                t.expenses = t.expenses.checked_add(e.amount)?;
            }
        }
        Ok(totals)
    }
}

/// Sort filtered rows the way `ORDER BY <column> <direction>, id` would,
/// then cut out the requested page.
fn page_of<T, S>(
    rows: impl Iterator<Item = T>,
    query: &ListQuery<S>,
    compare: impl Fn(S, &T, &T) -> Ordering,
) -> Page<T>
where
    T: Entity,
    S: SortField,
{
    let mut all: Vec<T> = rows.collect();
    all.sort_by(|a, b| {
        let primary = compare(query.sort, a, b);
        let primary = match query.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id().cmp(&b.id()))
    });
    Page::paginate(all, query)
}

/// In-memory store for development and tests.
///
/// One lock guards every table; multi-row operations validate completely
/// before the first mutation, so a failure leaves nothing half-written.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, product: Product) -> StoreResult<Product> {
        let mut state = self.write()?;
        if state.products.values().any(|p| p.code == product.code) {
            return Err(StoreError::conflict(format!(
                "product code '{}' is already in use",
                product.code
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product"))
    }

    async fn list_products(
        &self,
        query: &ListQuery<ProductSort>,
        filter: &ProductFilter,
    ) -> StoreResult<Page<Product>> {
        let state = self.read()?;
        let rows = state
            .products
            .values()
            .filter(|p| filter.matches(p) && query.matches(&p.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: UpdateProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let mut state = self.write()?;
        let mut product = state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product"))?;
        product.apply_update(update, now)?;
        if state
            .products
            .values()
            .any(|p| p.id != id && p.code == product.code)
        {
            return Err(StoreError::conflict(format!(
                "product code '{}' is already in use",
                product.code
            )));
        }
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn set_product_image(
        &self,
        id: ProductId,
        image: Option<String>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Product, Option<String>)> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("product"))?;
        let previous = std::mem::replace(&mut product.image, image);
        product.updated_at = now;
        Ok((product.clone(), previous))
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<Product> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::not_found("product"));
        }
        if state.product_referenced(id) {
            return Err(StoreError::conflict(
                "product is used by goods receives, stock outs or orders",
            ));
        }
        state
            .products
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("product"))
    }
}

#[async_trait]
impl SupplierRepository for InMemoryStore {
    async fn create_supplier(&self, supplier: Supplier) -> StoreResult<Supplier> {
        self.write()?.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Supplier> {
        self.read()?
            .suppliers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("supplier"))
    }

    async fn list_suppliers(&self, query: &ListQuery<SupplierSort>) -> StoreResult<Page<Supplier>> {
        let state = self.read()?;
        let rows = state
            .suppliers
            .values()
            .filter(|s| query.matches(&s.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    async fn update_supplier(&self, id: SupplierId, update: UpdateSupplier) -> StoreResult<Supplier> {
        let mut state = self.write()?;
        let supplier = state
            .suppliers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("supplier"))?;
        supplier.apply_update(update)?;
        Ok(supplier.clone())
    }

    async fn delete_supplier(&self, id: SupplierId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.suppliers.contains_key(&id) {
            return Err(StoreError::not_found("supplier"));
        }
        if state.goods_receives.values().any(|g| g.supplier_id == id) {
            return Err(StoreError::conflict("supplier has goods receives"));
        }
        state.suppliers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryStore {
    async fn create_employee(&self, employee: Employee) -> StoreResult<Employee> {
        let mut state = self.write()?;
        if state.employees.values().any(|e| e.email == employee.email) {
            return Err(StoreError::conflict(format!(
                "e-mail '{}' is already registered",
                employee.email
            )));
        }
        state.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: EmployeeId) -> StoreResult<Employee> {
        self.read()?
            .employees
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("employee"))
    }

    async fn find_employee_by_email(&self, email: &str) -> StoreResult<Option<Employee>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .read()?
            .employees
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn list_employees(
        &self,
        query: &ListQuery<EmployeeSort>,
        filter: &EmployeeFilter,
    ) -> StoreResult<Page<Employee>> {
        let state = self.read()?;
        let rows = state
            .employees
            .values()
            .filter(|e| filter.matches(e) && query.matches(&e.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        update: UpdateEmployee,
        actor: EmployeeId,
        now: DateTime<Utc>,
    ) -> StoreResult<Employee> {
        let mut state = self.write()?;
        let mut employee = state
            .employees
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("employee"))?;
        employee.apply_update(update, actor, now)?;
        if state
            .employees
            .values()
            .any(|e| e.id != id && e.email == employee.email)
        {
            return Err(StoreError::conflict(format!(
                "e-mail '{}' is already registered",
                employee.email
            )));
        }
        state.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn set_employee_password(
        &self,
        id: EmployeeId,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        let employee = state
            .employees
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("employee"))?;
        employee.set_password_hash(password_hash, now);
        Ok(())
    }

    async fn delete_employee(&self, id: EmployeeId, actor: EmployeeId) -> StoreResult<()> {
        let mut state = self.write()?;
        let employee = state
            .employees
            .get(&id)
            .ok_or_else(|| StoreError::not_found("employee"))?;
        employee.ensure_deletable_by(actor)?;
        state.employees.remove(&id);
        Ok(())
    }

    async fn count_employees(&self) -> StoreResult<u64> {
        Ok(self.read()?.employees.len() as u64)
    }
}

#[async_trait]
impl GoodsReceiveRepository for InMemoryStore {
    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, lines = input.items.len()), err)]
    async fn create_goods_receive(
        &self,
        input: NewGoodsReceive,
        received_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<GoodsReceive> {
        let mut state = self.write()?;
        if !state.suppliers.contains_key(&input.supplier_id) {
            return Err(StoreError::not_found("supplier"));
        }

        let date = input.document_date(now);
        let sequence = state.next_sequence(DocumentKind::GoodsReceive, date);
        let receive = GoodsReceive::create(
            input,
            DocumentKind::GoodsReceive.reference(date, sequence),
            received_by,
            now,
        )?;
        let changes = plan_receipt(&state.stock_levels(), &receive.stock_lines())?;

        state.apply_changes(&changes, now);
        for item in &receive.items {
            if let Some(p) = state.products.get_mut(&item.product_id) {
                p.cost_price = item.unit_cost;
            }
        }
        state
            .sequences
            .insert((DocumentKind::GoodsReceive, date), sequence);
        state.goods_receives.insert(receive.id, receive.clone());
        Ok(receive)
    }

    async fn get_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<GoodsReceive> {
        self.read()?
            .goods_receives
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("goods receive"))
    }

    async fn list_goods_receives(
        &self,
        query: &ListQuery<GoodsReceiveSort>,
        filter: &GoodsReceiveFilter,
    ) -> StoreResult<Page<GoodsReceive>> {
        let state = self.read()?;
        let rows = state
            .goods_receives
            .values()
            .filter(|g| filter.matches(g) && query.matches(&g.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    #[instrument(skip(self), err)]
    async fn delete_goods_receive(&self, id: GoodsReceiveId) -> StoreResult<()> {
        let mut state = self.write()?;
        let receive = state
            .goods_receives
            .get(&id)
            .ok_or_else(|| StoreError::not_found("goods receive"))?;
        let changes = plan_issue(&state.stock_levels(), &receive.stock_lines()).inspect_err(|e| {
            warn!(error = %e, "goods receive reversal rejected");
        })?;
        state.apply_changes(&changes, Utc::now());
        state.goods_receives.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl StockOutRepository for InMemoryStore {
    #[instrument(skip(self, input), fields(lines = input.items.len()), err)]
    async fn create_stock_out(
        &self,
        input: NewStockOut,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<StockOut> {
        let mut state = self.write()?;
        let prepared = state.prepare_stock_out(input, issued_by, None, now)?;
        Ok(state.commit_stock_out(prepared, now))
    }

    async fn get_stock_out(&self, id: StockOutId) -> StoreResult<StockOut> {
        self.read()?
            .stock_outs
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("stock out"))
    }

    async fn list_stock_outs(
        &self,
        query: &ListQuery<StockOutSort>,
        filter: &StockOutFilter,
    ) -> StoreResult<Page<StockOut>> {
        let state = self.read()?;
        let rows = state
            .stock_outs
            .values()
            .filter(|s| filter.matches(s) && query.matches(&s.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    #[instrument(skip(self), err)]
    async fn delete_stock_out(&self, id: StockOutId) -> StoreResult<()> {
        let mut state = self.write()?;
        let stock_out = state
            .stock_outs
            .get(&id)
            .ok_or_else(|| StoreError::not_found("stock out"))?;
        if let Some(order_id) = stock_out.order_id {
            return Err(StoreError::conflict(format!(
                "stock out fulfils order {order_id}"
            )));
        }
        let changes = plan_receipt(&state.stock_levels(), &stock_out.stock_lines())?;
        state.apply_changes(&changes, Utc::now());
        state.stock_outs.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(
        &self,
        input: NewOrder,
        created_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<Order> {
        let mut state = self.write()?;
        if input
            .items
            .iter()
            .any(|i| !state.products.contains_key(&i.product_id))
        {
            return Err(StoreError::not_found("product"));
        }
        let order = Order::create(
            input,
            |id| state.products.get(&id).map(|p| p.sale_price),
            created_by,
            now,
        )?;
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Order> {
        self.read()?
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order"))
    }

    async fn list_orders(
        &self,
        query: &ListQuery<OrderSort>,
        filter: &OrderFilter,
    ) -> StoreResult<Page<Order>> {
        let state = self.read()?;
        let rows = state
            .orders
            .values()
            .filter(|o| filter.matches(o) && query.matches(&o.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    #[instrument(skip(self), err)]
    async fn fulfill_order(
        &self,
        id: OrderId,
        issued_by: Option<EmployeeId>,
        now: DateTime<Utc>,
    ) -> StoreResult<(Order, StockOut)> {
        let mut state = self.write()?;
        let mut order = state
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order"))?;
        let input = order.to_stock_out(now.date_naive())?;
        let prepared = state.prepare_stock_out(input, issued_by, Some(id), now)?;
        order.fulfill(prepared.stock_out.id, now)?;

        let stock_out = state.commit_stock_out(prepared, now);
        state.orders.insert(id, order.clone());
        Ok((order, stock_out))
    }

    async fn cancel_order(&self, id: OrderId, now: DateTime<Utc>) -> StoreResult<Order> {
        let mut state = self.write()?;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order"))?;
        order.cancel(now)?;
        Ok(order.clone())
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryStore {
    async fn create_expense(&self, expense: Expense) -> StoreResult<Expense> {
        self.write()?.expenses.insert(expense.id, expense.clone());
        Ok(expense)
    }

    async fn get_expense(&self, id: ExpenseId) -> StoreResult<Expense> {
        self.read()?
            .expenses
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("expense"))
    }

    async fn list_expenses(
        &self,
        query: &ListQuery<ExpenseSort>,
        filter: &ExpenseFilter,
    ) -> StoreResult<Page<Expense>> {
        let state = self.read()?;
        let rows = state
            .expenses
            .values()
            .filter(|e| filter.matches(e) && query.matches(&e.search_fields()))
            .cloned();
        Ok(page_of(rows, query, |s, a, b| s.compare(a, b)))
    }

    async fn update_expense(&self, id: ExpenseId, update: UpdateExpense) -> StoreResult<Expense> {
        let mut state = self.write()?;
        let expense = state
            .expenses
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("expense"))?;
        expense.apply_update(update)?;
        Ok(expense.clone())
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<()> {
        self.write()?
            .expenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("expense"))
    }

    async fn expense_summary(&self, filter: &ExpenseFilter) -> StoreResult<ExpenseSummary> {
        let state = self.read()?;
        Ok(ExpenseSummary::build(
            filter.range,
            state.expenses.values().filter(|e| filter.matches(e)),
        )?)
    }
}

#[async_trait]
impl ReportRepository for InMemoryStore {
    async fn dashboard_summary(&self, today: NaiveDate) -> StoreResult<DashboardSummary> {
        let state = self.read()?;
        let mut counts = DashboardCounts {
            products: state.products.len() as u64,
            suppliers: state.suppliers.len() as u64,
            employees: state.employees.len() as u64,
            pending_orders: state
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Pending)
                .count() as u64,
            ..Default::default()
        };
        for p in state.products.values() {
            match StockStatus::classify(p.stock, p.reorder_level) {
                StockStatus::Low => counts.low_stock += 1,
                StockStatus::OutOfStock => counts.out_of_stock += 1,
                StockStatus::InStock => {}
            }
            counts.stock_value = counts
                .stock_value
                .checked_add(p.cost_price.times(p.stock.max(0))?)?;
        }

        let month = month_start(today);
        let totals = state.month_totals(&[month])?;
        Ok(DashboardSummary::new(
            counts,
            month,
            totals.get(&month).copied().unwrap_or_default(),
        )?)
    }

    async fn monthly_chart(&self, today: NaiveDate, months: u32) -> StoreResult<Vec<MonthSummary>> {
        let months = chart_months(today, months);
        let totals = self.read()?.month_totals(&months)?;
        Ok(monthly_series(&months, &totals)?)
    }

    async fn top_products(&self, limit: u32) -> StoreResult<Vec<TopProduct>> {
        let state = self.read()?;
        let mut issued: HashMap<ProductId, (i64, Money)> = HashMap::new();
        for so in state.stock_outs.values() {
            for item in &so.items {
                let entry = issued.entry(item.product_id).or_insert((0, Money::ZERO));
                entry.0 = entry
                    .0
                    .checked_add(item.quantity)
                    .ok_or(StockError::Overflow(item.product_id))?;
                entry.1 = entry.1.checked_add(item.line_total)?;
            }
        }
        let rows = issued
            .into_iter()
            .filter_map(|(id, (quantity, revenue))| {
                state.products.get(&id).map(|p| TopProduct {
                    product_id: id,
                    code: p.code.clone(),
                    name: p.name.clone(),
                    quantity,
                    revenue,
                })
            })
            .collect();
        Ok(rank_top_products(rows, limit))
    }

    async fn stock_rows(&self) -> StoreResult<Vec<StockReportRow>> {
        let state = self.read()?;
        state
            .products
            .values()
            .map(|p| {
                StockReportRow::new(
                    p.id,
                    p.code.clone(),
                    p.name.clone(),
                    p.category.clone(),
                    p.unit.clone(),
                    p.stock,
                    p.reorder_level,
                    p.cost_price,
                )
                .map_err(StoreError::from)
            })
            .collect()
    }
}
