use super::AlignmentKind;

/// Errors that can occur while mapping rows to domain objects and back
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The alignment kind cannot be expressed in (or read from) a table row
    #[error("{kind} alignment cannot be converted to rot/tilt/psi angles; use a projection alignment")]
    UnsupportedAlignmentError {
        /// Requested alignment kind
        kind: AlignmentKind,
    },

    /// A row lacks the fields required to build a sub-object
    #[error("Missing {entity} fields: {}", .labels.join(", "))]
    MissingDataError {
        /// Entity that could not be built
        entity: &'static str,
        /// STAR keys that were missing
        labels: Vec<String>,
    },

    /// A transform cannot be decomposed
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),
}
