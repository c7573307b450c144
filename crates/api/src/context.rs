use stockroom_auth::{Principal, Role};
use stockroom_core::EmployeeId;

/// Authenticated employee for a request.
///
/// Inserted by the auth middleware after the token is validated and the
/// account is confirmed active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(employee_id: EmployeeId, role: Role) -> Self {
        Self {
            principal: Principal::new(employee_id, role),
        }
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.principal.employee_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
