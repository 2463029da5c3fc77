//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user, from a Bearer token or the
//!   `auth_token` cookie.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireOperator`] -- requires `admin` or `user`.

pub mod auth;
pub mod rbac;
