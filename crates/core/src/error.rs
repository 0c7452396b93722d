use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A payment provider rejected or could not vouch for a payment
    /// (bad signature, session not paid, validation status not VALID).
    #[error("Payment provider error: {0}")]
    UpstreamPayment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
