//! Inventory rules: how documents move stock, and how stock is reported.
//!
//! Pure, deterministic logic (no IO). Storage backends call these planners
//! inside their transactions and apply the resulting changes.

pub mod movement;
pub mod report;

pub use movement::{StockChange, StockError, StockLine, plan_issue, plan_receipt};
pub use report::{StockReport, StockReportRow, StockStatus, StockSummary};
