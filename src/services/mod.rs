//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and persistence so route handlers can
//! stay focused on request parsing, session plumbing and redirects.

pub mod favourite;
pub mod home;
pub mod session;
pub mod upload;
pub mod user;
