use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::bulletins::domain::{
    ClassId, CohortKey, GenerationRequest, ReportCard, ReportCardDraft, ReportCardId, SchoolYear,
    ScoreEntry, StudentId, SubjectCoefficient, SubjectId, Term,
};
use crate::bulletins::memory::{InMemoryGradebook, InMemoryReportCardStore};
use crate::bulletins::repository::{ReportCardStore, RepositoryError, ScoreSource};
use crate::bulletins::{BulletinGenerator, GradingConfig};

pub(super) const CLASS: &str = "6A";
pub(super) const YEAR: &str = "2023-2024";

pub(super) fn class_id() -> ClassId {
    ClassId(CLASS.to_string())
}

pub(super) fn student(id: &str) -> StudentId {
    StudentId(id.to_string())
}

pub(super) fn subject(id: &str) -> SubjectId {
    SubjectId(id.to_string())
}

pub(super) fn request(term: u8) -> GenerationRequest {
    GenerationRequest::new(CLASS, term, YEAR)
}

pub(super) fn cohort_key(term: u8) -> CohortKey {
    request(term).cohort_key().expect("valid cohort key")
}

/// Class 6A: math (coef 4) and french (coef 2); amina and bruno scored in both, chloe only in
/// math for term 1.
pub(super) fn seeded_gradebook() -> InMemoryGradebook {
    let class = class_id();
    let mut gradebook = InMemoryGradebook::new();
    for id in ["amina", "bruno", "chloe"] {
        gradebook.enroll(&class, &student(id));
    }
    gradebook.register_subject(&class, &subject("math"), dec!(4));
    gradebook.register_subject(&class, &subject("french"), dec!(2));

    let scores: [(&str, &str, Decimal, Decimal); 7] = [
        ("amina", "math", dec!(12), dec!(1)),
        ("amina", "math", dec!(16), dec!(2)),
        ("amina", "math", dec!(8), dec!(1)),
        ("amina", "french", dec!(14), dec!(1)),
        ("bruno", "math", dec!(15), dec!(1)),
        ("bruno", "french", dec!(9), dec!(1)),
        ("chloe", "math", dec!(13), dec!(1)),
    ];
    for (who, what, value, weight) in scores {
        gradebook.record_score(
            &class,
            &student(who),
            &subject(what),
            Term::FIRST,
            ScoreEntry::new(value, weight),
        );
    }
    gradebook
}

pub(super) fn build_generator(
    gradebook: InMemoryGradebook,
) -> (
    BulletinGenerator<InMemoryGradebook, InMemoryReportCardStore>,
    Arc<InMemoryReportCardStore>,
) {
    let store = Arc::new(InMemoryReportCardStore::new());
    let generator =
        BulletinGenerator::new(Arc::new(gradebook), store.clone(), GradingConfig::default());
    (generator, store)
}

pub(super) fn card_for<'a>(cards: &'a [ReportCard], id: &str) -> &'a ReportCard {
    cards
        .iter()
        .find(|card| card.student_id.0 == id)
        .unwrap_or_else(|| panic!("report card for {id}"))
}

/// Score source that fails `list_scores` for selected students.
pub(super) struct FlakyScoreSource {
    pub(super) inner: InMemoryGradebook,
    pub(super) failing: HashSet<StudentId>,
}

impl ScoreSource for FlakyScoreSource {
    fn list_enrolled_students(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<StudentId>, RepositoryError> {
        self.inner.list_enrolled_students(class_id)
    }

    fn list_subjects_for_class(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<SubjectCoefficient>, RepositoryError> {
        self.inner.list_subjects_for_class(class_id)
    }

    fn list_scores(
        &self,
        student_id: &StudentId,
        subject_id: &SubjectId,
        class_id: &ClassId,
        term: Term,
    ) -> Result<Vec<ScoreEntry>, RepositoryError> {
        if self.failing.contains(student_id) {
            return Err(RepositoryError::Unavailable(format!(
                "scores for {student_id} are corrupt"
            )));
        }
        self.inner.list_scores(student_id, subject_id, class_id, term)
    }
}

/// Store that accepts a fixed number of creations, then reports an outage.
pub(super) struct FailingAfterStore {
    pub(super) inner: InMemoryReportCardStore,
    pub(super) remaining: Mutex<usize>,
}

impl FailingAfterStore {
    pub(super) fn new(creations: usize) -> Self {
        Self {
            inner: InMemoryReportCardStore::new(),
            remaining: Mutex::new(creations),
        }
    }
}

impl ReportCardStore for FailingAfterStore {
    fn find(
        &self,
        student_id: &StudentId,
        term: Term,
        school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError> {
        self.inner.find(student_id, term, school_year)
    }

    fn fetch(&self, id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn create(&self, draft: ReportCardDraft) -> Result<ReportCard, RepositoryError> {
        let mut remaining = self.remaining.lock().expect("store mutex poisoned");
        if *remaining == 0 {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        *remaining -= 1;
        self.inner.create(draft)
    }

    fn list_by_cohort(&self, key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError> {
        self.inner.list_by_cohort(key)
    }

    fn update_rank(&self, id: &ReportCardId, rank: u32) -> Result<(), RepositoryError> {
        self.inner.update_rank(id, rank)
    }
}

/// Store whose `find` never sees existing cards, as when another caller creates one between the
/// lookup and the insert; uniqueness is only enforced by `create`.
pub(super) struct BlindLookupStore {
    pub(super) inner: InMemoryReportCardStore,
}

impl ReportCardStore for BlindLookupStore {
    fn find(
        &self,
        _student_id: &StudentId,
        _term: Term,
        _school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError> {
        Ok(None)
    }

    fn fetch(&self, id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn create(&self, draft: ReportCardDraft) -> Result<ReportCard, RepositoryError> {
        self.inner.create(draft)
    }

    fn list_by_cohort(&self, key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError> {
        self.inner.list_by_cohort(key)
    }

    fn update_rank(&self, id: &ReportCardId, rank: u32) -> Result<(), RepositoryError> {
        self.inner.update_rank(id, rank)
    }
}

/// Store that persists cards but cannot write ranks.
pub(super) struct RankFailingStore {
    pub(super) inner: InMemoryReportCardStore,
}

impl ReportCardStore for RankFailingStore {
    fn find(
        &self,
        student_id: &StudentId,
        term: Term,
        school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError> {
        self.inner.find(student_id, term, school_year)
    }

    fn fetch(&self, id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn create(&self, draft: ReportCardDraft) -> Result<ReportCard, RepositoryError> {
        self.inner.create(draft)
    }

    fn list_by_cohort(&self, key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError> {
        self.inner.list_by_cohort(key)
    }

    fn update_rank(&self, _id: &ReportCardId, _rank: u32) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("rank column locked".to_string()))
    }
}

/// Store whose every call is unavailable.
pub(super) struct UnavailableStore;

impl ReportCardStore for UnavailableStore {
    fn find(
        &self,
        _student_id: &StudentId,
        _term: Term,
        _school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _draft: ReportCardDraft) -> Result<ReportCard, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_by_cohort(&self, _key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_rank(&self, _id: &ReportCardId, _rank: u32) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
