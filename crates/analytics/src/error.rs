use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A record handed to the calculator belongs to a different cycle or pond
    /// than the one being computed. Callers must pass fully scoped bundles.
    #[error("{record} {record_id} belongs to {owner} {found}, expected {expected}")]
    ScopeMismatch {
        record: &'static str,
        record_id: Uuid,
        owner: &'static str,
        found: Uuid,
        expected: Uuid,
    },

    #[error("Calculation error: arithmetic overflow in metric '{0}'")]
    Overflow(String),
}
