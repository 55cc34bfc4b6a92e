use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for classes (a group of students following the same curriculum).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub String);

/// Identifier wrapper for subjects taught in a class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub String);

/// Identifier assigned by the report-card store on creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportCardId(pub String);

macro_rules! display_id {
    ($($name:ident),*) => {
        $(impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_id!(StudentId, ClassId, SubjectId, ReportCardId);

/// School term, restricted to the three terms of a school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Term(u8);

impl Term {
    pub const FIRST: Term = Term(1);
    pub const SECOND: Term = Term(2);
    pub const THIRD: Term = Term(3);

    pub const fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Term {
    type Error = InvalidInput;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Term(value)),
            other => Err(InvalidInput::TermOutOfRange(other)),
        }
    }
}

impl From<Term> for u8 {
    fn from(term: Term) -> Self {
        term.0
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Opaque school-year label such as `2023-2024`, compared by equality only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolYear(String);

impl SchoolYear {
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidInput::EmptySchoolYear);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Malformed generation or lookup parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("class id must not be empty")]
    EmptyClassId,
    #[error("term must be 1, 2 or 3 (got {0})")]
    TermOutOfRange(u8),
    #[error("school year must not be empty")]
    EmptySchoolYear,
}

/// The (class, term, year) tuple that report cards are ranked within.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CohortKey {
    pub class_id: ClassId,
    pub term: Term,
    pub school_year: SchoolYear,
}

impl CohortKey {
    pub fn parse(class_id: &str, term: u8, school_year: &str) -> Result<Self, InvalidInput> {
        let class_id = class_id.trim();
        if class_id.is_empty() {
            return Err(InvalidInput::EmptyClassId);
        }
        Ok(Self {
            class_id: ClassId(class_id.to_string()),
            term: Term::try_from(term)?,
            school_year: SchoolYear::parse(school_year)?,
        })
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.class_id, self.term, self.school_year)
    }
}

/// Unvalidated caller parameters for a generation or cohort lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub class_id: String,
    pub term: u8,
    pub school_year: String,
}

impl GenerationRequest {
    pub fn new(class_id: impl Into<String>, term: u8, school_year: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            term,
            school_year: school_year.into(),
        }
    }

    pub fn cohort_key(&self) -> Result<CohortKey, InvalidInput> {
        CohortKey::parse(&self.class_id, self.term, &self.school_year)
    }
}

/// One recorded evaluation result: the score and the evaluation's coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub value: Decimal,
    pub weight: Decimal,
}

impl ScoreEntry {
    pub fn new(value: Decimal, weight: Decimal) -> Self {
        Self { value, weight }
    }
}

/// A subject taught in a class together with its curriculum coefficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectCoefficient {
    pub subject_id: SubjectId,
    pub weight: Decimal,
}

/// Weighted mean of one subject's evaluations for a student and term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAverage {
    pub subject_id: SubjectId,
    pub average: Decimal,
    pub subject_weight: Decimal,
}

/// Report card content computed by the generator, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCardDraft {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub term: Term,
    pub school_year: SchoolYear,
    pub overall_average: Decimal,
    pub cohort_size: u32,
    pub subject_averages: Vec<SubjectAverage>,
    pub generated_at: DateTime<Utc>,
}

/// Persisted report card ("bulletin"). Only `rank` and `narrative_comment` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCard {
    pub id: ReportCardId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub term: Term,
    pub school_year: SchoolYear,
    pub overall_average: Decimal,
    /// `None` until the first ranking pass over the cohort.
    pub rank: Option<u32>,
    pub cohort_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative_comment: Option<String>,
    pub subject_averages: Vec<SubjectAverage>,
    pub generated_at: DateTime<Utc>,
}

impl ReportCard {
    pub fn from_draft(id: ReportCardId, draft: ReportCardDraft) -> Self {
        Self {
            id,
            student_id: draft.student_id,
            class_id: draft.class_id,
            term: draft.term,
            school_year: draft.school_year,
            overall_average: draft.overall_average,
            rank: None,
            cohort_size: draft.cohort_size,
            narrative_comment: None,
            subject_averages: draft.subject_averages,
            generated_at: draft.generated_at,
        }
    }

    pub fn cohort_key(&self) -> CohortKey {
        CohortKey {
            class_id: self.class_id.clone(),
            term: self.term,
            school_year: self.school_year.clone(),
        }
    }

    pub fn subject_average(&self, subject_id: &SubjectId) -> Option<&SubjectAverage> {
        self.subject_averages
            .iter()
            .find(|entry| &entry.subject_id == subject_id)
    }
}

/// Rank computed for one report card during a ranking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankAssignment {
    pub report_card_id: ReportCardId,
    pub rank: u32,
}

/// Average, lowest and highest overall average across a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassStatistics {
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Single report card enriched with its cohort's statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportCardDetail {
    pub report_card: ReportCard,
    pub class_statistics: ClassStatistics,
}

/// A student excluded from a generation run because their averages could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentFailure {
    pub student_id: StudentId,
    pub reason: String,
}

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GenerationReport {
    pub created: Vec<ReportCard>,
    pub skipped_existing: usize,
    pub failed: Vec<StudentFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_accepts_only_three_terms() {
        assert_eq!(Term::try_from(1), Ok(Term::FIRST));
        assert_eq!(Term::try_from(3), Ok(Term::THIRD));
        assert_eq!(Term::try_from(0), Err(InvalidInput::TermOutOfRange(0)));
        assert_eq!(Term::try_from(4), Err(InvalidInput::TermOutOfRange(4)));
    }

    #[test]
    fn cohort_key_trims_and_rejects_blank_fields() {
        let key = CohortKey::parse(" 6A ", 2, " 2023-2024 ").expect("valid key");
        assert_eq!(key.class_id, ClassId("6A".to_string()));
        assert_eq!(key.term, Term::SECOND);
        assert_eq!(key.school_year.as_str(), "2023-2024");
        assert_eq!(key.to_string(), "6A/T2/2023-2024");

        assert_eq!(
            CohortKey::parse("  ", 1, "2023-2024"),
            Err(InvalidInput::EmptyClassId)
        );
        assert_eq!(
            CohortKey::parse("6A", 1, ""),
            Err(InvalidInput::EmptySchoolYear)
        );
    }

    #[test]
    fn term_deserializes_from_number_and_validates() {
        let term: Term = serde_json::from_str("2").expect("term parses");
        assert_eq!(term, Term::SECOND);
        assert!(serde_json::from_str::<Term>("7").is_err());
    }
}
