use rust_decimal::Decimal;

use super::averages::{round_half_up, ComputationError};
use super::domain::{ClassStatistics, ReportCard};

/// Mean, minimum and maximum overall average across a cohort; all zero when it is empty.
pub fn compute_class_statistics(
    cohort: &[ReportCard],
) -> Result<ClassStatistics, ComputationError> {
    let Some(first) = cohort.first() else {
        return Ok(ClassStatistics::default());
    };

    let mut total = Decimal::ZERO;
    let mut min = first.overall_average;
    let mut max = first.overall_average;

    for card in cohort {
        total = total
            .checked_add(card.overall_average)
            .ok_or(ComputationError::Overflow)?;
        min = min.min(card.overall_average);
        max = max.max(card.overall_average);
    }

    let mean = total
        .checked_div(Decimal::from(cohort.len()))
        .ok_or(ComputationError::Overflow)?;

    Ok(ClassStatistics {
        average: round_half_up(mean),
        min,
        max,
    })
}
