//! The shared library for Presence, an in-memory login session service.
//!
//! This library holds the pieces the backend and its clients agree on: the
//! JSON data structures, session identifiers, error types and logging setup.

pub mod data;
pub mod errors;
pub mod id;
pub mod log;

pub use serde;
pub use serde_json;
