//! `stockroom-auth`: employees, roles, tokens and password hashing.
//!
//! This crate is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod employee;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize, role_permissions};
pub use claims::{Claims, TokenValidationError, validate_claims};
pub use employee::{
    Employee, EmployeeFilter, EmployeeSort, EmployeeStatus, NewEmployee, UpdateEmployee,
};
pub use jwt::{Hs256Jwt, IssuedToken, TokenError};
pub use password::{
    PasswordError, burn_verification, check_password_strength, hash_password, verify_password,
};
pub use permissions::Permission;
pub use roles::Role;
