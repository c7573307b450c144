//! Parties domain module: the suppliers goods are received from.

pub mod supplier;

pub use supplier::{NewSupplier, Supplier, SupplierSort, UpdateSupplier};
