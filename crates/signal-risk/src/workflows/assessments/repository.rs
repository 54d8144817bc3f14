use crate::engine::{Assessment, SubjectId};

/// Storage abstraction holding the latest assessment per subject.
pub trait AssessmentRepository: Send + Sync {
    fn store(&self, assessment: Assessment) -> Result<(), RepositoryError>;
    fn latest(&self, subject: &SubjectId) -> Result<Option<Assessment>, RepositoryError>;
    fn subjects(&self) -> Result<Vec<SubjectId>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
