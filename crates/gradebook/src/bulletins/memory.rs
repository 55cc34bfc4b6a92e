//! In-process adapters backing the CLI, the HTTP service and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use rust_decimal::Decimal;

use super::domain::{
    ClassId, CohortKey, ReportCard, ReportCardDraft, ReportCardId, SchoolYear, ScoreEntry,
    StudentId, SubjectCoefficient, SubjectId, Term,
};
use super::repository::{ReportCardStore, RepositoryError, ScoreSource};

#[derive(Debug, Default, Clone)]
struct ClassRoster {
    students: Vec<StudentId>,
    subjects: Vec<SubjectCoefficient>,
}

type ScoreKey = (StudentId, SubjectId, ClassId, Term);

/// Enrollment, curriculum and scores held in memory. Populate it, then share it behind an `Arc`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryGradebook {
    classes: BTreeMap<ClassId, ClassRoster>,
    scores: HashMap<ScoreKey, Vec<ScoreEntry>>,
}

impl InMemoryGradebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the class without students or subjects.
    pub fn add_class(&mut self, class_id: &ClassId) {
        self.classes.entry(class_id.clone()).or_default();
    }

    /// Enrolls a student once; repeated enrollment keeps the original position.
    pub fn enroll(&mut self, class_id: &ClassId, student_id: &StudentId) {
        let roster = self.classes.entry(class_id.clone()).or_default();
        if !roster.students.contains(student_id) {
            roster.students.push(student_id.clone());
        }
    }

    /// Adds a subject to the class curriculum, replacing the coefficient if already present.
    pub fn register_subject(
        &mut self,
        class_id: &ClassId,
        subject_id: &SubjectId,
        weight: Decimal,
    ) {
        let roster = self.classes.entry(class_id.clone()).or_default();
        match roster
            .subjects
            .iter_mut()
            .find(|subject| &subject.subject_id == subject_id)
        {
            Some(existing) => existing.weight = weight,
            None => roster.subjects.push(SubjectCoefficient {
                subject_id: subject_id.clone(),
                weight,
            }),
        }
    }

    pub fn record_score(
        &mut self,
        class_id: &ClassId,
        student_id: &StudentId,
        subject_id: &SubjectId,
        term: Term,
        entry: ScoreEntry,
    ) {
        self.scores
            .entry((
                student_id.clone(),
                subject_id.clone(),
                class_id.clone(),
                term,
            ))
            .or_default()
            .push(entry);
    }

    pub fn class_ids(&self) -> impl Iterator<Item = &ClassId> {
        self.classes.keys()
    }

    pub fn score_count(&self) -> usize {
        self.scores.values().map(Vec::len).sum()
    }

    fn roster(&self, class_id: &ClassId) -> Result<&ClassRoster, RepositoryError> {
        self.classes.get(class_id).ok_or(RepositoryError::NotFound)
    }
}

impl ScoreSource for InMemoryGradebook {
    fn list_enrolled_students(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<StudentId>, RepositoryError> {
        Ok(self.roster(class_id)?.students.clone())
    }

    fn list_subjects_for_class(
        &self,
        class_id: &ClassId,
    ) -> Result<Vec<SubjectCoefficient>, RepositoryError> {
        Ok(self.roster(class_id)?.subjects.clone())
    }

    fn list_scores(
        &self,
        student_id: &StudentId,
        subject_id: &SubjectId,
        class_id: &ClassId,
        term: Term,
    ) -> Result<Vec<ScoreEntry>, RepositoryError> {
        let key = (
            student_id.clone(),
            subject_id.clone(),
            class_id.clone(),
            term,
        );
        Ok(self.scores.get(&key).cloned().unwrap_or_default())
    }
}

/// Report-card store keyed by id with (student, term, year) uniqueness.
#[derive(Debug, Default)]
pub struct InMemoryReportCardStore {
    records: Mutex<BTreeMap<ReportCardId, ReportCard>>,
    sequence: AtomicU64,
}

impl InMemoryReportCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored report card, ordered by id.
    pub fn all(&self) -> Result<Vec<ReportCard>, RepositoryError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<ReportCardId, ReportCard>>, RepositoryError> {
        self.records.lock().map_err(|_| {
            RepositoryError::Unavailable("report card store lock poisoned".to_string())
        })
    }

    fn next_id(&self) -> ReportCardId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ReportCardId(format!("rc-{id:06}"))
    }
}

impl ReportCardStore for InMemoryReportCardStore {
    fn find(
        &self,
        student_id: &StudentId,
        term: Term,
        school_year: &SchoolYear,
    ) -> Result<Option<ReportCard>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .find(|card| {
                &card.student_id == student_id
                    && card.term == term
                    && &card.school_year == school_year
            })
            .cloned())
    }

    fn fetch(&self, id: &ReportCardId) -> Result<Option<ReportCard>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn create(&self, draft: ReportCardDraft) -> Result<ReportCard, RepositoryError> {
        let mut guard = self.lock()?;
        let duplicate = guard.values().any(|card| {
            card.student_id == draft.student_id
                && card.term == draft.term
                && card.school_year == draft.school_year
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let card = ReportCard::from_draft(self.next_id(), draft);
        guard.insert(card.id.clone(), card.clone());
        Ok(card)
    }

    fn list_by_cohort(&self, key: &CohortKey) -> Result<Vec<ReportCard>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|card| {
                card.class_id == key.class_id
                    && card.term == key.term
                    && card.school_year == key.school_year
            })
            .cloned()
            .collect())
    }

    fn update_rank(&self, id: &ReportCardId, rank: u32) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let card = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        card.rank = Some(rank);
        Ok(())
    }
}
