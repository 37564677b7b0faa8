//! Authentication primitives.
//!
//! - [`jwt`] -- access-token generation and validation.
//! - [`session`] -- in-memory store of verified graph database sessions.

pub mod jwt;
pub mod session;
