//! Router Module Index
//!
//! Routes are grouped by the access they require, and access control is
//! attached per group in `create_router`:
//!
//! - `public`: no token.
//! - `authenticated`: a valid bearer token; handlers apply role and ownership checks.
//! - `editor`: a valid bearer token whose role is `editor`.

/// Routes reachable without a token.
pub mod public;

/// Routes behind the auth middleware.
pub mod authenticated;

/// Routes behind the auth middleware that additionally require the editor role.
pub mod editor;
