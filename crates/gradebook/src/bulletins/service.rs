use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::averages::{
    compute_overall_average, compute_subject_average, validate_scores, ComputationError,
};
use super::config::GradingConfig;
use super::domain::{
    ClassStatistics, CohortKey, GenerationReport, GenerationRequest, InvalidInput, RankAssignment,
    ReportCard, ReportCardDetail, ReportCardDraft, ReportCardId, StudentFailure, StudentId,
    SubjectAverage, SubjectCoefficient,
};
use super::ranking::assign_ranks;
use super::repository::{ReportCardStore, RepositoryError, ScoreSource};
use super::statistics::compute_class_statistics;

/// Generates report cards for a class and keeps the cohort's ranks current.
///
/// Callers serialize concurrent `generate` calls on the same cohort; the generator itself holds
/// no lock.
pub struct BulletinGenerator<S, R> {
    scores: Arc<S>,
    store: Arc<R>,
    grading: GradingConfig,
}

impl<S, R> BulletinGenerator<S, R>
where
    S: ScoreSource + 'static,
    R: ReportCardStore + 'static,
{
    pub fn new(scores: Arc<S>, store: Arc<R>, grading: GradingConfig) -> Self {
        Self {
            scores,
            store,
            grading,
        }
    }

    /// Creates a report card for every enrolled student that does not have one for the term and
    /// year yet, then re-ranks the whole cohort.
    ///
    /// Students whose averages cannot be computed are logged and listed in `failed`; store
    /// failures abort the run without undoing cards already written.
    pub fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationReport, GenerationError> {
        let key = request.cohort_key()?;

        let students = self
            .scores
            .list_enrolled_students(&key.class_id)
            .map_err(GenerationError::Source)?;
        if students.is_empty() {
            info!(cohort = %key, "no enrolled students, nothing to generate");
            return Ok(GenerationReport::default());
        }

        let subjects = self
            .scores
            .list_subjects_for_class(&key.class_id)
            .map_err(GenerationError::Source)?;
        let cohort_size = u32::try_from(students.len()).unwrap_or(u32::MAX);

        let mut report = GenerationReport::default();

        for student_id in &students {
            let (subject_averages, overall_average) =
                match self.student_averages(student_id, &subjects, &key) {
                    Ok(averages) => averages,
                    Err(error) => {
                        warn!(cohort = %key, student = %student_id, %error, "skipping student");
                        report.failed.push(StudentFailure {
                            student_id: student_id.clone(),
                            reason: error.to_string(),
                        });
                        continue;
                    }
                };

            if self
                .store
                .find(student_id, key.term, &key.school_year)
                .map_err(GenerationError::Store)?
                .is_some()
            {
                debug!(cohort = %key, student = %student_id, "report card already exists");
                report.skipped_existing += 1;
                continue;
            }

            let draft = ReportCardDraft {
                student_id: student_id.clone(),
                class_id: key.class_id.clone(),
                term: key.term,
                school_year: key.school_year.clone(),
                overall_average,
                cohort_size,
                subject_averages,
                generated_at: Utc::now(),
            };

            match self.store.create(draft) {
                Ok(card) => report.created.push(card),
                Err(RepositoryError::Conflict) => {
                    debug!(
                        cohort = %key,
                        student = %student_id,
                        "report card created concurrently"
                    );
                    report.skipped_existing += 1;
                }
                Err(error) => return Err(GenerationError::Store(error)),
            }
        }

        let assignments = self.rerank(&key)?;
        let ranks: HashMap<&ReportCardId, u32> = assignments
            .iter()
            .map(|assignment| (&assignment.report_card_id, assignment.rank))
            .collect();
        for card in &mut report.created {
            card.rank = ranks.get(&card.id).copied();
        }

        info!(
            cohort = %key,
            created = report.created.len(),
            skipped = report.skipped_existing,
            failed = report.failed.len(),
            ranked = assignments.len(),
            "report card generation finished"
        );

        Ok(report)
    }

    /// Recomputes competition ranks over every stored card in the cohort and persists them.
    pub fn rerank(&self, key: &CohortKey) -> Result<Vec<RankAssignment>, GenerationError> {
        let cohort = self
            .store
            .list_by_cohort(key)
            .map_err(GenerationError::Store)?;
        let assignments = assign_ranks(&cohort);

        for assignment in &assignments {
            self.store
                .update_rank(&assignment.report_card_id, assignment.rank)
                .map_err(GenerationError::Store)?;
        }

        Ok(assignments)
    }

    pub fn class_statistics(
        &self,
        request: &GenerationRequest,
    ) -> Result<ClassStatistics, GenerationError> {
        let key = request.cohort_key()?;
        let cohort = self
            .store
            .list_by_cohort(&key)
            .map_err(GenerationError::Store)?;
        compute_class_statistics(&cohort).map_err(GenerationError::Statistics)
    }

    /// Report cards of a cohort, best rank first; cards not yet ranked come last.
    pub fn cohort(&self, request: &GenerationRequest) -> Result<Vec<ReportCard>, GenerationError> {
        let key = request.cohort_key()?;
        let mut cards = self
            .store
            .list_by_cohort(&key)
            .map_err(GenerationError::Store)?;
        cards.sort_by_key(|card| (card.rank.unwrap_or(u32::MAX), card.student_id.clone()));
        Ok(cards)
    }

    /// A single report card together with its cohort's statistics.
    pub fn detail(&self, id: &ReportCardId) -> Result<ReportCardDetail, GenerationError> {
        let report_card = self
            .store
            .fetch(id)
            .map_err(GenerationError::Store)?
            .ok_or(GenerationError::Store(RepositoryError::NotFound))?;
        let cohort = self
            .store
            .list_by_cohort(&report_card.cohort_key())
            .map_err(GenerationError::Store)?;

        Ok(ReportCardDetail {
            class_statistics: compute_class_statistics(&cohort)
                .map_err(GenerationError::Statistics)?,
            report_card,
        })
    }

    fn student_averages(
        &self,
        student_id: &StudentId,
        subjects: &[SubjectCoefficient],
        key: &CohortKey,
    ) -> Result<(Vec<SubjectAverage>, Decimal), StudentComputationError> {
        let mut subject_averages = Vec::with_capacity(subjects.len());

        for subject in subjects {
            let scores = self.scores.list_scores(
                student_id,
                &subject.subject_id,
                &key.class_id,
                key.term,
            )?;
            if scores.is_empty() {
                continue;
            }
            validate_scores(&scores, &self.grading)?;

            subject_averages.push(SubjectAverage {
                subject_id: subject.subject_id.clone(),
                average: compute_subject_average(&scores)?,
                subject_weight: subject.weight,
            });
        }

        let overall = compute_overall_average(&subject_averages)?;
        Ok((subject_averages, overall))
    }
}

/// Failure confined to one student; the run continues without them.
#[derive(Debug, thiserror::Error)]
pub enum StudentComputationError {
    #[error("scores unavailable: {0}")]
    Source(#[from] RepositoryError),
    #[error(transparent)]
    Computation(#[from] ComputationError),
}

/// Error raised by the bulletin generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("score source failure: {0}")]
    Source(#[source] RepositoryError),
    #[error("report card store failure: {0}")]
    Store(#[source] RepositoryError),
    #[error("class statistics unavailable: {0}")]
    Statistics(#[source] ComputationError),
}

impl GenerationError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GenerationError::Source(RepositoryError::NotFound)
                | GenerationError::Store(RepositoryError::NotFound)
        )
    }
}
