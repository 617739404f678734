//! Shared types and models for the Manufacturing Operations Platform
//!
//! This crate contains the validated input schemas, domain enums and the
//! arithmetic behind every derived metric. It is used by the backend to
//! re-validate payloads and by the frontend (via WASM) for form handling.

pub mod forms;
pub mod metrics;
pub mod models;
pub mod types;
pub mod validation;

pub use forms::*;
pub use metrics::*;
pub use models::*;
pub use types::*;
pub use validation::*;
