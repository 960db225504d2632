//! Shared types for the MHS survey pipeline.
//!
//! This crate provides:
//! - The unified error taxonomy and `Result` alias
//! - The fixed survey column schema
//! - The `Frame` observation table and its CSV round-trip

pub mod error;
pub mod frame;
pub mod schema;

pub use error::{Error, ErrorCategory, Result};
pub use frame::{Frame, Value};
