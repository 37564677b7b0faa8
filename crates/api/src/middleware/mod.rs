//! Request extractors shared by the handlers.
//!
//! - [`auth::AuthSession`] -- resolves the caller's graph session from a JWT Bearer token.

pub mod auth;
