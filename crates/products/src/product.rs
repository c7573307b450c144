use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{optional_text, require_text};
use stockroom_core::{DomainError, DomainResult, Entity, Money, ProductId, SortDirection, SortField};

/// Catalog product with its current stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub stock: i64,
    pub reorder_level: i64,
    /// Path relative to the upload root, e.g. `products/<id>.png`.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_price: i64,
    #[serde(default)]
    pub sale_price: i64,
    #[serde(default)]
    pub opening_stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

/// Partial update. Stock is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub cost_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub reorder_level: Option<i64>,
}

const DEFAULT_UNIT: &str = "pcs";

fn check_reorder_level(level: i64) -> DomainResult<i64> {
    if level < 0 {
        return Err(DomainError::validation("reorder_level", "cannot be negative"));
    }
    Ok(level)
}

impl Product {
    /// Validate input and build a new product.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        if input.opening_stock < 0 {
            return Err(DomainError::validation("opening_stock", "cannot be negative"));
        }

        Ok(Self {
            id: ProductId::new(),
            code: require_text("code", &input.code)?,
            name: require_text("name", &input.name)?,
            category: optional_text(input.category),
            unit: optional_text(input.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            cost_price: Money::non_negative("cost_price", input.cost_price)?,
            sale_price: Money::non_negative("sale_price", input.sale_price)?,
            stock: input.opening_stock,
            reorder_level: check_reorder_level(input.reorder_level)?,
            image: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update. On error the product is left untouched.
    pub fn apply_update(&mut self, update: UpdateProduct, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();

        if let Some(code) = update.code {
            next.code = require_text("code", &code)?;
        }
        if let Some(name) = update.name {
            next.name = require_text("name", &name)?;
        }
        if let Some(category) = update.category {
            next.category = optional_text(Some(category));
        }
        if let Some(unit) = update.unit {
            next.unit = require_text("unit", &unit)?;
        }
        if let Some(cost) = update.cost_price {
            next.cost_price = Money::non_negative("cost_price", cost)?;
        }
        if let Some(price) = update.sale_price {
            next.sale_price = Money::non_negative("sale_price", price)?;
        }
        if let Some(level) = update.reorder_level {
            next.reorder_level = check_reorder_level(level)?;
        }
        next.updated_at = now;

        *self = next;
        Ok(())
    }

    pub fn search_fields(&self) -> [&str; 3] {
        [
            self.name.as_str(),
            self.code.as_str(),
            self.category.as_deref().unwrap_or(""),
        ]
    }
}

/// List filters beyond search/sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, p: &Product) -> bool {
        self.category.as_deref().is_none_or(|c| {
            p.category
                .as_deref()
                .is_some_and(|pc| pc.eq_ignore_ascii_case(c))
        })
    }
}

/// Image formats accepted for product pictures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> DomainResult<Self> {
        match content_type {
            "image/png" => Ok(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Ok(ImageKind::Jpeg),
            "image/webp" => Ok(ImageKind::Webp),
            "image/gif" => Ok(ImageKind::Gif),
            _ => Err(DomainError::validation(
                "image",
                "must be a png, jpeg, webp or gif image",
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }

    /// Relative storage path for a product's picture.
    pub fn storage_path(self, id: ProductId) -> String {
        format!("products/{id}.{}", self.extension())
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Name,
    Code,
    Category,
    Stock,
    SalePrice,
    CreatedAt,
}

impl SortField for ProductSort {
    const NAMES: &'static [&'static str] =
        &["name", "code", "category", "stock", "sale_price", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(ProductSort::Name),
            "code" => Some(ProductSort::Code),
            "category" => Some(ProductSort::Category),
            "stock" => Some(ProductSort::Stock),
            "sale_price" => Some(ProductSort::SalePrice),
            "created_at" => Some(ProductSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            ProductSort::Name => "name",
            ProductSort::Code => "code",
            ProductSort::Category => "category",
            ProductSort::Stock => "stock",
            ProductSort::SalePrice => "sale_price",
            ProductSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            ProductSort::CreatedAt => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

impl ProductSort {
    /// Ordering used by in-memory listings, matching the SQL `ORDER BY`.
    pub fn compare(self, a: &Product, b: &Product) -> core::cmp::Ordering {
        match self {
            ProductSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            ProductSort::Code => a.code.cmp(&b.code),
            ProductSort::Category => a.category.cmp(&b.category),
            ProductSort::Stock => a.stock.cmp(&b.stock),
            ProductSort::SalePrice => a.sale_price.cmp(&b.sale_price),
            ProductSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            code: " SKU-1 ".into(),
            name: "Widget".into(),
            category: Some("  ".into()),
            unit: None,
            cost_price: 150,
            sale_price: 250,
            opening_stock: 4,
            reorder_level: 2,
        }
    }

    #[test]
    fn create_normalises_input() {
        let p = Product::create(new_product(), Utc::now()).unwrap();
        assert_eq!(p.code, "SKU-1");
        assert_eq!(p.category, None);
        assert_eq!(p.unit, "pcs");
        assert_eq!(p.stock, 4);
        assert_eq!(p.sale_price, Money::from_minor(250));
    }

    #[test]
    fn create_rejects_negative_prices_and_blank_names() {
        let mut input = new_product();
        input.sale_price = -1;
        assert_eq!(
            Product::create(input, Utc::now()).unwrap_err(),
            DomainError::validation("sale_price", "cannot be negative")
        );

        let mut input = new_product();
        input.name = "   ".into();
        assert!(Product::create(input, Utc::now()).is_err());

        let mut input = new_product();
        input.opening_stock = -3;
        assert!(Product::create(input, Utc::now()).is_err());
    }

    #[test]
    fn failed_update_leaves_product_untouched() {
        let mut p = Product::create(new_product(), Utc::now()).unwrap();
        let before = p.clone();
        let err = p
            .apply_update(
                UpdateProduct {
                    name: Some("Gadget".into()),
                    reorder_level: Some(-1),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "reorder_level", .. }));
        assert_eq!(p, before);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut p = Product::create(new_product(), Utc::now()).unwrap();
        p.apply_update(
            UpdateProduct {
                sale_price: Some(999),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(p.sale_price, Money::from_minor(999));
        assert_eq!(p.name, "Widget");
        assert_eq!(p.stock, 4);
    }

    #[test]
    fn image_kind_from_content_type() {
        let id = ProductId::new();
        let kind = ImageKind::from_content_type("image/jpeg").unwrap();
        assert_eq!(kind.storage_path(id), format!("products/{id}.jpg"));
        assert!(ImageKind::from_content_type("application/pdf").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-blank code/name with non-negative numbers is accepted
            /// and keeps its trimmed text.
            #[test]
            fn valid_input_is_accepted(
                code in "[A-Z0-9-]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,60}",
                cost in 0i64..10_000_000,
                price in 0i64..10_000_000,
                stock in 0i64..100_000,
            ) {
                let p = Product::create(NewProduct {
                    code: code.clone(),
                    name: name.clone(),
                    category: None,
                    unit: Some("box".into()),
                    cost_price: cost,
                    sale_price: price,
                    opening_stock: stock,
                    reorder_level: 0,
                }, Utc::now()).unwrap();
                prop_assert_eq!(p.code, code.trim());
                prop_assert_eq!(p.name, name.trim());
                prop_assert_eq!(p.stock, stock);
            }
        }
    }
}
