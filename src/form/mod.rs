//! Pending create/edit values for each entity, with local validation and the
//! normalisation applied before a row is sent to the backend.

pub mod entries;
pub mod project;
pub mod schema;

pub use entries::{CategoryDraft, ReviewDraft, ServiceDraft};
pub use project::{ProjectCommand, ProjectDraft};
pub use schema::{CategoryKind, FormSchema, ProjectField};

use serde_json::Value;

use crate::content::Entity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in required fields")]
    MissingFields(Vec<&'static str>),

    #[error("Slug must use lowercase letters, digits and single hyphens")]
    InvalidSlug(String),

    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange(i32),
}

/// A form holder that can be checked locally and turned into a row.
pub trait Draft: Default + Clone + Send + Sync {
    const ENTITY: Entity;

    fn validate(&self) -> Result<(), ValidationError>;

    /// The row sent to the backend, with blank optional fields as `null`.
    fn to_row(&self) -> Value;
}

/// Collects the names of required fields that are absent or empty.
/// Whitespace counts as a value.
pub(crate) fn missing(fields: &[(&'static str, Option<&str>)]) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.is_none_or(str::is_empty))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingFields(missing))
    }
}

/// Empty strings go to the backend as `null`.
pub(crate) fn text(value: &Option<String>) -> Value {
    match value.as_deref() {
        Some(s) if !s.is_empty() => Value::String(s.to_string()),
        _ => Value::Null,
    }
}
