//! Backend services for login session management.
//!
//! This module provides the session registry abstraction and its in-memory
//! implementation. Nothing here survives a restart.

pub mod sessions;

pub use sessions::*;
