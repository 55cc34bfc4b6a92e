use super::domain::{RankAssignment, ReportCard};

/// Competition ranking ("1224") over a cohort, best overall average first.
///
/// Equal averages share a rank; the next distinct average takes its 1-based position in the
/// sorted order. Ties are not broken further, and the returned assignments follow the sorted
/// order (input order among equals).
pub fn assign_ranks(cohort: &[ReportCard]) -> Vec<RankAssignment> {
    let mut ordered: Vec<&ReportCard> = cohort.iter().collect();
    ordered.sort_by(|left, right| right.overall_average.cmp(&left.overall_average));

    let mut assignments = Vec::with_capacity(ordered.len());
    let mut previous: Option<(&ReportCard, u32)> = None;

    for (position, card) in ordered.into_iter().enumerate() {
        let ordinal = u32::try_from(position + 1).unwrap_or(u32::MAX);
        let rank = match previous {
            Some((prior, prior_rank)) if prior.overall_average == card.overall_average => {
                prior_rank
            }
            _ => ordinal,
        };
        previous = Some((card, rank));
        assignments.push(RankAssignment {
            report_card_id: card.id.clone(),
            rank,
        });
    }

    assignments
}
