//! Human-readable document references (`GR-20240105-0001`).

use chrono::NaiveDate;

/// Document families that carry a reference number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    GoodsReceive,
    StockOut,
}

impl DocumentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentKind::GoodsReceive => "GR",
            DocumentKind::StockOut => "SO",
        }
    }

    /// Format a reference from the document date and its 1-based daily sequence.
    pub fn reference(self, date: NaiveDate, sequence: u32) -> String {
        format!("{}-{}-{:04}", self.prefix(), date.format("%Y%m%d"), sequence)
    }

    /// Common prefix of every reference issued on `date` (for sequence lookups).
    pub fn day_prefix(self, date: NaiveDate) -> String {
        format!("{}-{}-", self.prefix(), date.format("%Y%m%d"))
    }
}
