use gradebook::bulletins::{
    ClassId, CohortKey, GradebookImportError, GradebookImporter, InMemoryGradebook, ScoreEntry,
    StudentId, SubjectId, Term,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type LockTable = Mutex<HashMap<CohortKey, Arc<AsyncMutex<()>>>>;

/// One async mutex per cohort so overlapping generation requests for the same class, term and
/// year run one after the other. Entries live only while a request holds or awaits them.
#[derive(Default)]
pub(crate) struct CohortLocks {
    locks: Arc<LockTable>,
}

impl CohortLocks {
    /// Waits for exclusive access to the cohort; released when the guard drops.
    pub(crate) async fn acquire(&self, key: &CohortKey) -> CohortGuard {
        let lock = lock_table(&self.locks)
            .entry(key.clone())
            .or_default()
            .clone();
        let registration = Registration {
            key: key.clone(),
            locks: self.locks.clone(),
            lock: Some(lock.clone()),
        };

        CohortGuard {
            _guard: lock.lock_owned().await,
            _registration: registration,
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        lock_table(&self.locks).len()
    }
}

fn lock_table(
    locks: &LockTable,
) -> std::sync::MutexGuard<'_, HashMap<CohortKey, Arc<AsyncMutex<()>>>> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive access to one cohort. Fields drop in order: the mutex is released before the
/// registration prunes the table.
pub(crate) struct CohortGuard {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

/// A request's interest in a cohort lock, dropped on release or when the wait is cancelled.
struct Registration {
    key: CohortKey,
    locks: Arc<LockTable>,
    lock: Option<Arc<AsyncMutex<()>>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        drop(self.lock.take());

        // Only the table's own handle left: nobody holds or waits on this cohort.
        let mut table = lock_table(&self.locks);
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}

pub(crate) fn load_gradebook(
    path: Option<&Path>,
) -> Result<InMemoryGradebook, GradebookImportError> {
    match path {
        Some(path) => GradebookImporter::from_path(path),
        None => Ok(demo_gradebook()),
    }
}

/// Class `6A` with four students, three subjects and two terms of scores.
pub(crate) fn demo_gradebook() -> InMemoryGradebook {
    let class = ClassId("6A".to_string());
    let mut gradebook = InMemoryGradebook::new();

    let subjects = [("math", 4), ("french", 3), ("history", 2), ("sport", 1)];
    for (subject, weight) in subjects {
        gradebook.register_subject(&class, &SubjectId(subject.to_string()), Decimal::from(weight));
    }

    // (student, subject, term, score, evaluation weight); scores are in hundredths
    let scores: &[(&str, &str, u8, i64, i64)] = &[
        ("amina", "math", 1, 1400, 1),
        ("amina", "math", 1, 1650, 2),
        ("amina", "french", 1, 1300, 1),
        ("amina", "history", 1, 1525, 1),
        ("amina", "sport", 1, 1700, 1),
        ("bruno", "math", 1, 1100, 1),
        ("bruno", "math", 1, 950, 2),
        ("bruno", "french", 1, 1200, 2),
        ("bruno", "sport", 1, 1500, 1),
        ("chloe", "math", 1, 1800, 2),
        ("chloe", "french", 1, 1550, 1),
        ("chloe", "history", 1, 1400, 1),
        ("chloe", "sport", 1, 1200, 1),
        ("amina", "math", 2, 1500, 1),
        ("bruno", "math", 2, 1500, 1),
        ("chloe", "french", 2, 1675, 1),
    ];

    for student in ["amina", "bruno", "chloe", "dara"] {
        gradebook.enroll(&class, &StudentId(student.to_string()));
    }

    for &(student, subject, term, hundredths, weight) in scores {
        let Ok(term) = Term::try_from(term) else {
            continue;
        };
        gradebook.record_score(
            &class,
            &StudentId(student.to_string()),
            &SubjectId(subject.to_string()),
            term,
            ScoreEntry::new(Decimal::new(hundredths, 2), Decimal::from(weight)),
        );
    }

    gradebook
}
