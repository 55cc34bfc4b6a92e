use super::domain::{
    ClassId, CohortKey, ReportCard, ReportCardDraft, ReportCardId, SchoolYear, ScoreEntry,
    StudentId, SubjectCoefficient, SubjectId, Term,
};

/// Read access to enrollment, curriculum and recorded scores owned by the grading subsystem.
pub trait ScoreSource: Send + Sync {
    /// Students enrolled in the class, in enrollment order. Unknown classes are `NotFound`.
    fn list_enrolled_students(&self, class_id: &ClassId) -> Result<Vec<StudentId>, RepositoryError>;
    fn list_subjects_for_class(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<SubjectCoefficient>, RepositoryError>;
    fn list_scores(
        &self,
        student_id: &StudentId,
        subject_id: &SubjectId,
        class_id: &ClassId,
        term: Term,
    ) -> Result<Vec<ScoreEntry>, RepositoryError>;
}

/// Storage abstraction for report cards so the generator can be exercised in isolation.
pub trait ReportCardStore: Send + Sync {
    fn find(
        &self,
        student_id: &StudentId,
        term: Term,
        school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError>;
    fn fetch(&self, id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError>;
    /// Persists a draft and assigns its id. A card for the same (student, term, year) is a
    /// `Conflict`.
    fn create(&self, draft: ReportCardDraft) -> Result<ReportCard, RepositoryError>;
    fn list_by_cohort(&self, key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError>;
    fn update_rank(&self, id: &ReportCardId, rank: u32) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
