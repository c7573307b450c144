//! Route-level permission guard.
//!
//! Handlers call [`require`] before touching storage; the role policy itself
//! lives in `stockroom-auth`.

use stockroom_auth::{Permission, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), ApiError> {
    authorize(principal.principal(), permission)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_auth::Role;
    use stockroom_core::EmployeeId;

    #[test]
    fn staff_cannot_manage_employees() {
        let staff = PrincipalContext::new(EmployeeId::new(), Role::Staff);
        assert!(require(&staff, &Permission::EMPLOYEES_WRITE).is_err());
        assert!(require(&staff, &Permission::STOCK_OUTS_WRITE).is_ok());
    }

    #[test]
    fn admin_passes_everything() {
        let admin = PrincipalContext::new(EmployeeId::new(), Role::Admin);
        assert!(require(&admin, &Permission::EMPLOYEES_WRITE).is_ok());
        assert!(require(&admin, &Permission::REPORTS_READ).is_ok());
    }
}
