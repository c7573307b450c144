//! Printable goods-receive invoices.
//!
//! `document` gathers what goes on the invoice, `layout` places it on A4
//! pages (pure, testable), and `render` turns the layout into PDF bytes.

pub mod document;
pub mod layout;
pub mod render;

pub use document::{InvoiceDocument, InvoiceLine};
pub use layout::{Align, FontWeight, PageLayout, Rule, TextRun, layout};
pub use render::{RenderError, render_pdf};
