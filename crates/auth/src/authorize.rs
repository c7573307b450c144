use serde::Serialize;
use thiserror::Error;

use stockroom_core::EmployeeId;

use crate::{Permission, Role};

/// The authenticated employee a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub employee_id: EmployeeId,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

static ADMIN: &[Permission] = &[Permission::WILDCARD];

static MANAGER: &[Permission] = &[
    Permission::PRODUCTS_READ,
    Permission::PRODUCTS_WRITE,
    Permission::SUPPLIERS_READ,
    Permission::SUPPLIERS_WRITE,
    Permission::GOODS_RECEIVES_READ,
    Permission::GOODS_RECEIVES_WRITE,
    Permission::STOCK_OUTS_READ,
    Permission::STOCK_OUTS_WRITE,
    Permission::STOCK_OUTS_DELETE,
    Permission::ORDERS_READ,
    Permission::ORDERS_WRITE,
    Permission::EXPENSES_READ,
    Permission::EXPENSES_WRITE,
    Permission::DASHBOARD_READ,
    Permission::REPORTS_READ,
];

static STAFF: &[Permission] = &[
    Permission::PRODUCTS_READ,
    Permission::SUPPLIERS_READ,
    Permission::STOCK_OUTS_READ,
    Permission::STOCK_OUTS_WRITE,
    Permission::ORDERS_READ,
    Permission::ORDERS_WRITE,
    Permission::DASHBOARD_READ,
];

/// Permissions granted by a role.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN,
        Role::Manager => MANAGER,
        Role::Staff => STAFF,
    }
}

impl Principal {
    pub fn new(employee_id: EmployeeId, role: Role) -> Self {
        Self { employee_id, role }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        role_permissions(self.role)
    }
}

/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions()
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        tracing::debug!(
            employee_id = %principal.employee_id,
            role = %principal.role,
            permission = %required,
            "permission denied"
        );
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new(EmployeeId::new(), role)
    }

    #[test]
    fn admin_is_allowed_everything() {
        let p = principal(Role::Admin);
        assert!(authorize(&p, &Permission::EMPLOYEES_WRITE).is_ok());
        assert!(authorize(&p, &Permission::new("anything.else")).is_ok());
    }

    #[test]
    fn manager_cannot_manage_employees() {
        let p = principal(Role::Manager);
        assert!(authorize(&p, &Permission::GOODS_RECEIVES_WRITE).is_ok());
        assert_eq!(
            authorize(&p, &Permission::EMPLOYEES_READ),
            Err(AuthzError::Forbidden("employees.read".into()))
        );
        assert!(MANAGER.iter().all(|p| p.area() != "employees"));
    }

    #[test]
    fn staff_sells_but_does_not_buy() {
        let p = principal(Role::Staff);
        assert!(authorize(&p, &Permission::STOCK_OUTS_WRITE).is_ok());
        assert!(authorize(&p, &Permission::ORDERS_WRITE).is_ok());
        assert!(authorize(&p, &Permission::GOODS_RECEIVES_READ).is_err());
        assert!(authorize(&p, &Permission::PRODUCTS_WRITE).is_err());
        assert!(authorize(&p, &Permission::STOCK_OUTS_DELETE).is_err());
        assert!(authorize(&p, &Permission::EXPENSES_READ).is_err());
    }
}
