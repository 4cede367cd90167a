//! Hand-off from the ingestion collaborator.

pub mod validator;

pub use validator::{DataValidator, RawBar, ValidationError};
