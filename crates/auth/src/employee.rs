//! Employee accounts: the users of the system.
//!
//! Invariants:
//! - e-mail is unique (enforced by storage) and stored lowercased;
//! - suspended employees cannot log in;
//! - employees cannot delete themselves or change their own role or status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::error::{check_email, optional_text, require_text};
use stockroom_core::{
    DomainError, DomainResult, EmployeeId, Entity, SortDirection, SortField,
};

use crate::password::check_password_strength;
use crate::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Suspended,
}

impl EmployeeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(EmployeeStatus::Active),
            "suspended" => Ok(EmployeeStatus::Suspended),
            _ => Err(DomainError::validation("status", "must be one of: active, suspended")),
        }
    }
}

impl core::fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub status: EmployeeStatus,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub joined_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> EmployeeId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub role: Role,
    pub password: String,
    #[serde(default)]
    pub joined_on: Option<NaiveDate>,
}

impl NewEmployee {
    /// Validate everything, including password strength, before hashing.
    pub fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)?;
        check_email("email", self.email.trim())?;
        check_password_strength(&self.password)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
    pub status: Option<EmployeeStatus>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Employee {
    pub fn create(input: NewEmployee, password_hash: String, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: EmployeeId::new(),
            name: require_text("name", &input.name)?,
            email: normalize_email(&input.email),
            phone: optional_text(input.phone),
            address: optional_text(input.address),
            role: input.role,
            status: EmployeeStatus::Active,
            password_hash,
            joined_on: input.joined_on.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    /// Apply a partial update made by `actor`; nothing changes on error.
    pub fn apply_update(
        &mut self,
        update: UpdateEmployee,
        actor: EmployeeId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if actor == self.id {
            if update.role.is_some_and(|r| r != self.role) {
                return Err(DomainError::invariant("cannot change your own role"));
            }
            if update.status.is_some_and(|s| s != self.status) {
                return Err(DomainError::invariant("cannot change your own status"));
            }
        }

        let name = update.name.as_deref().map(|n| require_text("name", n)).transpose()?;
        let email = match update.email.as_deref() {
            Some(e) => {
                check_email("email", e.trim())?;
                Some(normalize_email(e))
            }
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if update.phone.is_some() {
            self.phone = optional_text(update.phone);
        }
        if update.address.is_some() {
            self.address = optional_text(update.address);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_password_hash(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.updated_at = now;
    }

    pub fn ensure_deletable_by(&self, actor: EmployeeId) -> DomainResult<()> {
        if actor == self.id {
            return Err(DomainError::invariant("cannot delete your own account"));
        }
        Ok(())
    }

    pub fn search_fields(&self) -> [&str; 3] {
        [
            self.name.as_str(),
            self.email.as_str(),
            self.phone.as_deref().unwrap_or(""),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    pub role: Option<Role>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeFilter {
    pub fn matches(&self, e: &Employee) -> bool {
        self.role.is_none_or(|r| r == e.role) && self.status.is_none_or(|s| s == e.status)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum EmployeeSort {
    #[default]
    Name,
    Email,
    Role,
    JoinedOn,
    CreatedAt,
}

impl SortField for EmployeeSort {
    const NAMES: &'static [&'static str] = &["name", "email", "role", "joined_on", "created_at"];

    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(EmployeeSort::Name),
            "email" => Some(EmployeeSort::Email),
            "role" => Some(EmployeeSort::Role),
            "joined_on" => Some(EmployeeSort::JoinedOn),
            "created_at" => Some(EmployeeSort::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            EmployeeSort::Name => "name",
            EmployeeSort::Email => "email",
            EmployeeSort::Role => "role",
            EmployeeSort::JoinedOn => "joined_on",
            EmployeeSort::CreatedAt => "created_at",
        }
    }

    fn default_direction(self) -> SortDirection {
        match self {
            EmployeeSort::JoinedOn | EmployeeSort::CreatedAt => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

impl EmployeeSort {
    pub fn compare(self, a: &Employee, b: &Employee) -> core::cmp::Ordering {
        match self {
            EmployeeSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            EmployeeSort::Email => a.email.cmp(&b.email),
            EmployeeSort::Role => a.role.as_str().cmp(b.role.as_str()),
            EmployeeSort::JoinedOn => a.joined_on.cmp(&b.joined_on),
            EmployeeSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewEmployee {
        NewEmployee {
            name: " Ada Lovelace ".into(),
            email: "Ada@Example.COM".into(),
            phone: None,
            address: Some("  ".into()),
            role: Role::Staff,
            password: "longenough".into(),
            joined_on: None,
        }
    }

    #[test]
    fn create_normalises_fields() {
        let e = Employee::create(input(), "hash".into(), Utc::now()).unwrap();
        assert_eq!(e.name, "Ada Lovelace");
        assert_eq!(e.email, "ada@example.com");
        assert_eq!(e.address, None);
        assert!(e.is_active());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let e = Employee::create(input(), "secret-hash".into(), Utc::now()).unwrap();
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn weak_password_and_bad_email_are_rejected() {
        let mut i = input();
        i.password = "short".into();
        assert!(i.validate().is_err());

        let mut i = input();
        i.email = "not-an-email".into();
        assert!(matches!(i.validate(), Err(DomainError::Validation { field: "email", .. })));
    }

    #[test]
    fn employees_cannot_demote_suspend_or_delete_themselves() {
        let mut e = Employee::create(input(), "h".into(), Utc::now()).unwrap();
        let me = e.id;

        let err = e
            .apply_update(
                UpdateEmployee { role: Some(Role::Admin), ..Default::default() },
                me,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(e
            .apply_update(
                UpdateEmployee { status: Some(EmployeeStatus::Suspended), ..Default::default() },
                me,
                Utc::now(),
            )
            .is_err());
        assert!(e.ensure_deletable_by(me).is_err());

        let admin = EmployeeId::new();
        e.apply_update(
            UpdateEmployee { status: Some(EmployeeStatus::Suspended), ..Default::default() },
            admin,
            Utc::now(),
        )
        .unwrap();
        assert!(!e.is_active());
        assert!(e.ensure_deletable_by(admin).is_ok());
    }
}
