use super::eligibility::Ineligibility;
use super::lifecycle::TransitionError;
use super::repository::RepositoryError;

/// Error raised by the dispatch service and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Ineligible(#[from] Ineligibility),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("another transition holds the vehicle, driver, or trip; retry later")]
    ConcurrentAssignmentConflict,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl FleetError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable snake_case identifier for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::NotFound { .. } => "not_found",
            FleetError::Ineligible(reason) => reason.code(),
            FleetError::Transition(error) => error.code(),
            FleetError::ConcurrentAssignmentConflict => "concurrent_assignment_conflict",
            FleetError::InvalidRequest(_) => "invalid_request",
            FleetError::Repository(_) => "repository_error",
        }
    }
}
