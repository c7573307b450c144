use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{check_email, optional_text, require_text};
use stockroom_core::{DomainResult, Entity, SortDirection, SortField, SupplierId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial update; an empty string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateSupplier {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn normalise_email(email: Option<String>) -> DomainResult<Option<String>> {
    match optional_text(email) {
        Some(e) => {
            check_email("email", &e)?;
            Ok(Some(e.to_lowercase()))
        }
        None => Ok(None),
    }
}

impl Supplier {
    pub fn create(input: NewSupplier, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: SupplierId::new(),
            name: require_text("name", &input.name)?,
            contact_person: optional_text(input.contact_person),
            phone: optional_text(input.phone),
            email: normalise_email(input.email)?,
            address: optional_text(input.address),
            created_at: now,
        })
    }

    pub fn apply_update(&mut self, update: UpdateSupplier) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = require_text("name", &name)?;
        }
        if update.contact_person.is_some() {
            next.contact_person = optional_text(update.contact_person);
        }
        if update.phone.is_some() {
            next.phone = optional_text(update.phone);
        }
        if update.email.is_some() {
            next.email = normalise_email(update.email)?;
        }
        if update.address.is_some() {
            next.address = optional_text(update.address);
        }
        *self = next;
        Ok(())
    }

    /// Text fields covered by list search.
    pub fn search_fields(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.contact_person.as_deref().unwrap_or(""),
            self.phone.as_deref().unwrap_or(""),
            self.email.as_deref().unwrap_or(""),
        ]
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SupplierSort {
    #[default]
    Name,
    CreatedAt,
}

impl SortField for SupplierSort {
    const NAMES: &'static [&'static str] = &["name", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(SupplierSort::Name),
            "created_at" => Some(SupplierSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            SupplierSort::Name => "name",
            SupplierSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            SupplierSort::Name => SortDirection::Asc,
            SupplierSort::CreatedAt => SortDirection::Desc,
        }
    }
}

impl SupplierSort {
    pub fn compare(self, a: &Supplier, b: &Supplier) -> core::cmp::Ordering {
        match self {
            SupplierSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SupplierSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::DomainError;

    fn input() -> NewSupplier {
        NewSupplier {
            name: "Acme Wholesale".into(),
            contact_person: Some("R. Diaz".into()),
            phone: Some(" 555-0100 ".into()),
            email: Some("Orders@Acme.test".into()),
            address: None,
        }
    }

    #[test]
    fn create_normalises_contact_fields() {
        let s = Supplier::create(input(), Utc::now()).unwrap();
        assert_eq!(s.phone.as_deref(), Some("555-0100"));
        assert_eq!(s.email.as_deref(), Some("orders@acme.test"));
    }

    #[test]
    fn create_rejects_bad_email() {
        let mut i = input();
        i.email = Some("nope".into());
        assert!(matches!(
            Supplier::create(i, Utc::now()),
            Err(DomainError::Validation { field: "email", .. })
        ));
    }

    #[test]
    fn empty_string_clears_optional_field() {
        let mut s = Supplier::create(input(), Utc::now()).unwrap();
        s.apply_update(UpdateSupplier {
            phone: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.phone, None);
        assert_eq!(s.contact_person.as_deref(), Some("R. Diaz"));
    }
}
