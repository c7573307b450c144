//! Products domain module.
//!
//! Catalog entries and their validation rules. Stock levels live on the
//! product row but only move through goods receive and stock out.

pub mod product;

pub use product::{ImageKind, NewProduct, Product, ProductFilter, ProductSort, UpdateProduct};
