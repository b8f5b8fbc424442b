use itemrando_game::LocationId;
use thiserror::Error;

/// Failures that abort a single randomization attempt.
///
/// None of these are recovered from inside the engine; the caller retries with a new seed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RandoError {
    /// No legal destination exists for an item. Lists the locations still empty at that point.
    #[error("unable to place {item}: no legal location among {} empty ({})", .empty_locations.len(), .empty_locations.join(", "))]
    UnsatisfiableFill {
        item: String,
        empty_locations: Vec<String>,
    },

    /// A requirement could not be evaluated (dangling reference, missing setting value,
    /// or a reference chain too deep to be anything but a cycle).
    #[error("invalid requirement in {context}: {reason}")]
    InvalidPredicate { context: String, reason: String },

    #[error("copied world diverges from its source at location {location}")]
    CloneConsistency { location: LocationId },

    #[error("filled world does not satisfy the win condition")]
    NotBeatable,

    #[error("unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },
}

impl RandoError {
    /// Whether another item placement seed might succeed. Broken world definitions and
    /// settings fail the same way for every seed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RandoError::UnsatisfiableFill { .. } | RandoError::NotBeatable
        )
    }
}
