//! Weighted-mean reductions from evaluation scores to subject and overall averages.
//!
//! Every average leaves this module rounded to two decimal places, half-up, so that equality
//! comparisons during ranking operate on the same values that are persisted.

use rust_decimal::{Decimal, RoundingStrategy};

use super::config::GradingConfig;
use super::domain::{ScoreEntry, SubjectAverage, SubjectId};

/// Failure while reducing scores to an average.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationError {
    #[error("no scores recorded")]
    NoScores,
    #[error("weight must be positive (got {0})")]
    NonPositiveWeight(Decimal),
    #[error("score {value} is outside 0..={max}")]
    ScoreOutOfRange { value: Decimal, max: Decimal },
    #[error("subject {0} has a non-positive coefficient")]
    NonPositiveSubjectWeight(SubjectId),
    #[error("decimal arithmetic overflowed")]
    Overflow,
}

/// Rounds to two decimal places, midpoints away from zero.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `Σ(value × weight) / Σ(weight)` over one subject's scores, rounded half-up.
///
/// Callers skip subjects without scores; an empty slice is reported as
/// [`ComputationError::NoScores`].
pub fn compute_subject_average(scores: &[ScoreEntry]) -> Result<Decimal, ComputationError> {
    if scores.is_empty() {
        return Err(ComputationError::NoScores);
    }
    if let Some(entry) = scores.iter().find(|entry| entry.weight <= Decimal::ZERO) {
        return Err(ComputationError::NonPositiveWeight(entry.weight));
    }

    weighted_mean(scores.iter().map(|entry| (entry.value, entry.weight))).map(round_half_up)
}

/// Weighted mean of subject averages by curriculum coefficient. A student without any scored
/// subject gets an overall average of zero.
pub fn compute_overall_average(subjects: &[SubjectAverage]) -> Result<Decimal, ComputationError> {
    if subjects.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if let Some(subject) = subjects
        .iter()
        .find(|subject| subject.subject_weight <= Decimal::ZERO)
    {
        return Err(ComputationError::NonPositiveSubjectWeight(
            subject.subject_id.clone(),
        ));
    }

    weighted_mean(
        subjects
            .iter()
            .map(|subject| (subject.average, subject.subject_weight)),
    )
    .map(round_half_up)
}

/// Checks every score against the configured scale and every weight for positivity.
pub(crate) fn validate_scores(
    scores: &[ScoreEntry],
    grading: &GradingConfig,
) -> Result<(), ComputationError> {
    for entry in scores {
        if entry.weight <= Decimal::ZERO {
            return Err(ComputationError::NonPositiveWeight(entry.weight));
        }
        if entry.value < Decimal::ZERO || entry.value > grading.max_score {
            return Err(ComputationError::ScoreOutOfRange {
                value: entry.value,
                max: grading.max_score,
            });
        }
    }
    Ok(())
}

fn weighted_mean<I>(pairs: I) -> Result<Decimal, ComputationError>
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut weighted_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for (value, weight) in pairs {
        let product = value
            .checked_mul(weight)
            .ok_or(ComputationError::Overflow)?;
        weighted_sum = weighted_sum
            .checked_add(product)
            .ok_or(ComputationError::Overflow)?;
        total_weight = total_weight
            .checked_add(weight)
            .ok_or(ComputationError::Overflow)?;
    }

    weighted_sum
        .checked_div(total_weight)
        .ok_or(ComputationError::NoScores)
}
