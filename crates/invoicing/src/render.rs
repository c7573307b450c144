use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use thiserror::Error;

use crate::layout::{FontWeight, PAGE_HEIGHT, PAGE_WIDTH, PageLayout, layout};
use crate::InvoiceDocument;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf error: {0}")]
    Pdf(String),
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw(layer: &PdfLayerReference, page: &PageLayout, fonts: &Fonts) {
    for rule in &page.rules {
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(rule.x1), Mm(rule.y)), false),
                (Point::new(Mm(rule.x2), Mm(rule.y)), false),
            ],
            is_closed: false,
        });
    }
    for run in &page.runs {
        let font = match run.weight {
            FontWeight::Regular => &fonts.regular,
            FontWeight::Bold => &fonts.bold,
        };
        layer.use_text(run.text.clone(), run.size, Mm(run.left()), Mm(run.y), font);
    }
}

/// Render an invoice to PDF bytes.
pub fn render_pdf(doc: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
    let pages = layout(doc);
    let title = format!("{} {}", doc.title, doc.reference);

    let (pdf, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
    let fonts = Fonts {
        regular: pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
        bold: pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?,
    };

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "content");
            pdf.get_page(p).get_layer(l)
        };
        draw(&layer, page, &fonts);
    }

    tracing::debug!(reference = %doc.reference, pages = pages.len(), "rendered invoice");
    pdf.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvoiceLine;
    use chrono::NaiveDate;
    use stockroom_core::Money;

    #[test]
    fn renders_a_pdf() {
        let doc = InvoiceDocument {
            company: "Corner Shop".into(),
            title: "Goods Receive Invoice".into(),
            reference: "GR-20240105-0001".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            party_heading: "Supplier".into(),
            party_lines: vec!["Acme Wholesale".into()],
            lines: vec![InvoiceLine {
                description: "Tea 500g".into(),
                quantity: 12,
                unit_cost: Money::from_minor(350),
                line_total: Money::from_minor(4200),
            }],
            totals: vec![("Total".into(), Money::from_minor(4200))],
            note: None,
        };

        let bytes = render_pdf(&doc).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }
}
