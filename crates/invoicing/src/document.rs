use chrono::NaiveDate;

use stockroom_core::{Money, ProductId};
use stockroom_parties::Supplier;
use stockroom_purchasing::GoodsReceive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub line_total: Money,
}

/// Everything printed on a goods-receive invoice, already resolved to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDocument {
    pub company: String,
    pub title: String,
    pub reference: String,
    pub date: NaiveDate,
    pub party_heading: String,
    pub party_lines: Vec<String>,
    pub lines: Vec<InvoiceLine>,
    pub totals: Vec<(String, Money)>,
    pub note: Option<String>,
}

impl InvoiceDocument {
    /// `product_label` resolves a product id to the text printed on its line.
    pub fn for_goods_receive(
        company: &str,
        receive: &GoodsReceive,
        supplier: &Supplier,
        product_label: impl Fn(ProductId) -> String,
    ) -> Self {
        let party_lines = [
            Some(supplier.name.clone()),
            supplier.contact_person.as_ref().map(|c| format!("Attn: {c}")),
            supplier.phone.as_ref().map(|p| format!("Phone: {p}")),
            supplier.email.as_ref().map(|e| format!("Email: {e}")),
            supplier.address.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            company: company.to_string(),
            title: "Goods Receive Invoice".to_string(),
            reference: receive.reference.clone(),
            date: receive.received_on,
            party_heading: "Supplier".to_string(),
            party_lines,
            lines: receive
                .items
                .iter()
                .map(|i| InvoiceLine {
                    description: product_label(i.product_id),
                    quantity: i.quantity,
                    unit_cost: i.unit_cost,
                    line_total: i.line_total,
                })
                .collect(),
            totals: vec![
                ("Subtotal".to_string(), receive.subtotal),
                ("Discount".to_string(), receive.discount),
                ("Total".to_string(), receive.total),
                ("Paid".to_string(), receive.paid),
                ("Due".to_string(), receive.due),
            ],
            note: receive.note.clone(),
        }
    }
}
