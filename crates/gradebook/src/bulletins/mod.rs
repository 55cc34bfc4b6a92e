//! Report-card ("bulletin") generation: subject and overall averages, competition ranking and
//! class statistics over the scores recorded by the grading subsystem.

pub mod averages;
mod config;
pub mod domain;
pub mod import;
pub mod memory;
pub mod ranking;
pub mod repository;
pub mod service;
pub mod statistics;

#[cfg(test)]
mod tests;

pub use averages::{
    compute_overall_average, compute_subject_average, round_half_up, ComputationError,
};
pub use config::GradingConfig;
pub use domain::{
    ClassId, ClassStatistics, CohortKey, GenerationReport, GenerationRequest, InvalidInput,
    RankAssignment, ReportCard, ReportCardDetail, ReportCardDraft, ReportCardId, SchoolYear,
    ScoreEntry, StudentFailure, StudentId, SubjectAverage, SubjectCoefficient, SubjectId, Term,
};
pub use import::{GradebookImportError, GradebookImporter};
pub use memory::{InMemoryGradebook, InMemoryReportCardStore};
pub use ranking::assign_ranks;
pub use repository::{ReportCardStore, RepositoryError, ScoreSource};
pub use service::{BulletinGenerator, GenerationError, StudentComputationError};
pub use statistics::compute_class_statistics;
