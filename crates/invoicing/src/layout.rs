//! Page layout for invoices, in millimetres from the bottom-left corner.

use crate::InvoiceDocument;

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;

const MARGIN: f32 = 15.0;
const RIGHT: f32 = PAGE_WIDTH - MARGIN;
const BOTTOM: f32 = 25.0;
const ROW: f32 = 6.5;
const BODY: f32 = 10.0;

// Column anchors: description left-aligned, numbers right-aligned.
const COL_NO: f32 = MARGIN;
const COL_DESC: f32 = MARGIN + 10.0;
const COL_QTY: f32 = 125.0;
const COL_UNIT: f32 = 160.0;
const COL_TOTAL: f32 = RIGHT;

const DESC_MAX_CHARS: usize = 52;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Left edge for `Align::Left`, right edge for `Align::Right`.
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub align: Align,
}

impl TextRun {
    /// Approximate rendered width for Helvetica (digits are 0.556 em).
    pub fn width(&self) -> f32 {
        const PT_TO_MM: f32 = 0.3528;
        self.text.chars().count() as f32 * self.size * 0.556 * PT_TO_MM
    }

    /// Left edge to hand to the PDF writer.
    pub fn left(&self) -> f32 {
        match self.align {
            Align::Left => self.x,
            Align::Right => (self.x - self.width()).max(0.0),
        }
    }
}

/// Horizontal rule.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
    pub rules: Vec<Rule>,
}

impl PageLayout {
    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, weight: FontWeight, align: Align) {
        self.runs.push(TextRun {
            text: text.into(),
            x,
            y,
            size,
            weight,
            align,
        });
    }

    fn rule(&mut self, y: f32) {
        self.rules.push(Rule { x1: MARGIN, x2: RIGHT, y });
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.runs.iter().any(|r| r.text.contains(needle))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Company and document header. Returns the y below it.
fn header(page: &mut PageLayout, doc: &InvoiceDocument, full: bool) -> f32 {
    let mut y = PAGE_HEIGHT - MARGIN - 5.0;
    page.text(&doc.company, MARGIN, y, 18.0, FontWeight::Bold, Align::Left);
    page.text(&doc.title, RIGHT, y, 14.0, FontWeight::Bold, Align::Right);
    y -= 8.0;
    page.text(format!("Reference: {}", doc.reference), RIGHT, y, BODY, FontWeight::Regular, Align::Right);
    y -= 5.5;
    page.text(
        format!("Date: {}", doc.date.format("%d %b %Y")),
        RIGHT,
        y,
        BODY,
        FontWeight::Regular,
        Align::Right,
    );
    y -= 4.0;
    page.rule(y);
    y -= 8.0;

    if full {
        page.text(&doc.party_heading, MARGIN, y, 11.0, FontWeight::Bold, Align::Left);
        y -= 5.5;
        for line in &doc.party_lines {
            page.text(truncate(line, 80), MARGIN, y, BODY, FontWeight::Regular, Align::Left);
            y -= 5.0;
        }
        y -= 5.0;
    }
    y
}

fn table_header(page: &mut PageLayout, mut y: f32) -> f32 {
    page.text("#", COL_NO, y, BODY, FontWeight::Bold, Align::Left);
    page.text("Product", COL_DESC, y, BODY, FontWeight::Bold, Align::Left);
    page.text("Qty", COL_QTY, y, BODY, FontWeight::Bold, Align::Right);
    page.text("Unit cost", COL_UNIT, y, BODY, FontWeight::Bold, Align::Right);
    page.text("Line total", COL_TOTAL, y, BODY, FontWeight::Bold, Align::Right);
    y -= 2.5;
    page.rule(y);
    y - ROW + 1.5
}

fn totals_height(doc: &InvoiceDocument) -> f32 {
    let note = if doc.note.is_some() { 2.0 * ROW } else { 0.0 };
    4.0 + doc.totals.len() as f32 * ROW + note
}

/// Lay the invoice out over as many pages as its lines need.
///
/// Every page repeats the document header and the table header; the supplier
/// block is only on the first page and totals only on the last.
pub fn layout(doc: &InvoiceDocument) -> Vec<PageLayout> {
    let mut pages: Vec<PageLayout> = Vec::new();
    let mut page = PageLayout::default();
    let top = header(&mut page, doc, true);
    let mut y = table_header(&mut page, top);

    for (n, line) in doc.lines.iter().enumerate() {
        if y < BOTTOM {
            pages.push(std::mem::take(&mut page));
            let top = header(&mut page, doc, false);
            y = table_header(&mut page, top);
        }
        page.text((n + 1).to_string(), COL_NO, y, BODY, FontWeight::Regular, Align::Left);
        page.text(truncate(&line.description, DESC_MAX_CHARS), COL_DESC, y, BODY, FontWeight::Regular, Align::Left);
        page.text(line.quantity.to_string(), COL_QTY, y, BODY, FontWeight::Regular, Align::Right);
        page.text(line.unit_cost.to_string(), COL_UNIT, y, BODY, FontWeight::Regular, Align::Right);
        page.text(line.line_total.to_string(), COL_TOTAL, y, BODY, FontWeight::Regular, Align::Right);
        y -= ROW;
    }

    if y - totals_height(doc) < BOTTOM {
        pages.push(std::mem::take(&mut page));
        y = header(&mut page, doc, false);
    }

    y += ROW - 3.0;
    page.rule(y);
    y -= ROW;
    for (label, amount) in &doc.totals {
        let weight = if label == "Total" { FontWeight::Bold } else { FontWeight::Regular };
        page.text(label.as_str(), COL_UNIT, y, BODY, weight, Align::Right);
        page.text(amount.to_string(), COL_TOTAL, y, BODY, weight, Align::Right);
        y -= ROW;
    }
    if let Some(note) = &doc.note {
        y -= ROW / 2.0;
        page.text(format!("Note: {}", truncate(note, 95)), MARGIN, y, 9.0, FontWeight::Regular, Align::Left);
    }
    pages.push(page);

    let count = pages.len();
    for (i, p) in pages.iter_mut().enumerate() {
        p.text(format!("Page {} of {count}", i + 1), RIGHT, MARGIN, 8.0, FontWeight::Regular, Align::Right);
    }
    pages
}
