//! `stockroom-core`: ids, money, errors and list parameters shared by
//! every domain crate. No storage or HTTP concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod listing;
pub mod reference;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EmployeeId, ExpenseId, GoodsReceiveId, OrderId, ProductId, StockOutId, SupplierId};
pub use reference::DocumentKind;
pub use listing::{DateRange, ListQuery, Page, SortDirection, SortField};
pub use value_object::{Money, ValueObject};
