//! Shared types

pub mod error;

pub use error::{AuthError, ChirpyError, Result};
