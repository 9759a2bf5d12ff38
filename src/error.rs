use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockError {
    /// A reconciliation pass was started while another was in flight.
    /// This is a caller contract violation, not a recoverable state;
    /// everything else in the crate self-heals instead of erroring.
    #[error("reconciliation already in progress")]
    ReentrantReconcile,
}
