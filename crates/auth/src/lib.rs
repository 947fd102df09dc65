//! Caller identity: who is making the request, and with what role.
//!
//! Session issuance and credential storage live elsewhere; this crate only
//! models the fact the rest of the service consumes: *who* is calling (a
//! customer id, or nobody for guests) and *what role* they carry. It is
//! intentionally decoupled from HTTP and storage.

pub mod actor;
pub mod claims;
pub mod roles;

pub use actor::Actor;
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use roles::Role;
