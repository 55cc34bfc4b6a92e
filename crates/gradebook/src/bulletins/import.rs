use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::domain::{ClassId, InvalidInput, ScoreEntry, StudentId, SubjectId, Term};
use super::memory::InMemoryGradebook;

#[derive(Debug)]
pub enum GradebookImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
}

impl std::fmt::Display for GradebookImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradebookImportError::Io(err) => write!(f, "failed to read gradebook export: {}", err),
            GradebookImportError::Csv(err) => write!(f, "invalid gradebook CSV data: {}", err),
            GradebookImportError::InvalidRow { line, reason } => {
                write!(f, "invalid gradebook row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for GradebookImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GradebookImportError::Io(err) => Some(err),
            GradebookImportError::Csv(err) => Some(err),
            GradebookImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for GradebookImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for GradebookImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads enrollment, curriculum and scores from a flat CSV export.
///
/// Expected headers: `class_id,student_id,subject_id,subject_weight,term,score,weight`. A row
/// with blank `score` and `weight` enrolls the student and registers the subject only.
pub struct GradebookImporter;

impl GradebookImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<InMemoryGradebook, GradebookImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<InMemoryGradebook, GradebookImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut gradebook = InMemoryGradebook::new();

        for (index, record) in csv_reader.deserialize::<GradebookRow>().enumerate() {
            // header occupies line 1
            let line = index + 2;
            let row = record?;
            row.apply(&mut gradebook)
                .map_err(|reason| GradebookImportError::InvalidRow { line, reason })?;
        }

        Ok(gradebook)
    }
}

#[derive(Debug, Deserialize)]
struct GradebookRow {
    class_id: String,
    student_id: String,
    subject_id: String,
    subject_weight: String,
    term: u8,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    weight: Option<String>,
}

impl GradebookRow {
    fn apply(self, gradebook: &mut InMemoryGradebook) -> Result<(), String> {
        if self.class_id.is_empty() || self.student_id.is_empty() || self.subject_id.is_empty() {
            return Err("class_id, student_id and subject_id are required".to_string());
        }

        let class_id = ClassId(self.class_id);
        let student_id = StudentId(self.student_id);
        let subject_id = SubjectId(self.subject_id);
        let subject_weight = parse_decimal("subject_weight", &self.subject_weight)?;
        let term = Term::try_from(self.term).map_err(|err: InvalidInput| err.to_string())?;

        gradebook.enroll(&class_id, &student_id);
        gradebook.register_subject(&class_id, &subject_id, subject_weight);

        match (self.score, self.weight) {
            (None, None) => Ok(()),
            (Some(score), Some(weight)) => {
                let entry = ScoreEntry::new(
                    parse_decimal("score", &score)?,
                    parse_decimal("weight", &weight)?,
                );
                gradebook.record_score(&class_id, &student_id, &subject_id, term, entry);
                Ok(())
            }
            _ => Err("score and weight must be provided together".to_string()),
        }
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|err| format!("{field} '{raw}' is not a decimal ({err})"))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulletins::repository::ScoreSource;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    const EXPORT: &str = "\
class_id,student_id,subject_id,subject_weight,term,score,weight
6A,amina,math,4,1,12,1
6A,amina,math,4,1,16,2
6A,amina,french,3,1,11.5,1
6A,bruno,math,4,1,9,1
6A,chloe,french,3,1,,
";

    #[test]
    fn imports_enrollment_curriculum_and_scores() {
        let gradebook = GradebookImporter::from_reader(Cursor::new(EXPORT)).expect("imports");
        let class = ClassId("6A".to_string());

        let students = gradebook.list_enrolled_students(&class).expect("class exists");
        assert_eq!(
            students,
            vec![
                StudentId("amina".to_string()),
                StudentId("bruno".to_string()),
                StudentId("chloe".to_string()),
            ]
        );

        let subjects = gradebook.list_subjects_for_class(&class).expect("class exists");
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].subject_id, SubjectId("math".to_string()));
        assert_eq!(subjects[0].weight, dec!(4));

        let scores = gradebook
            .list_scores(
                &StudentId("amina".to_string()),
                &SubjectId("math".to_string()),
                &class,
                Term::FIRST,
            )
            .expect("scores");
        assert_eq!(
            scores,
            vec![
                ScoreEntry::new(dec!(12), dec!(1)),
                ScoreEntry::new(dec!(16), dec!(2))
            ]
        );
        assert_eq!(gradebook.score_count(), 4);
    }

    #[test]
    fn rejects_half_filled_score_rows() {
        let export = "\
class_id,student_id,subject_id,subject_weight,term,score,weight
6A,amina,math,4,1,12,
";
        match GradebookImporter::from_reader(Cursor::new(export)) {
            Err(GradebookImportError::InvalidRow { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("together"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn rejects_terms_outside_the_school_year() {
        let export = "\
class_id,student_id,subject_id,subject_weight,term,score,weight
6A,amina,math,4,1,12,1
6A,amina,math,4,5,12,1
";
        match GradebookImporter::from_reader(Cursor::new(export)) {
            Err(GradebookImportError::InvalidRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("term"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_decimals() {
        let export = "\
class_id,student_id,subject_id,subject_weight,term,score,weight
6A,amina,math,four,1,12,1
";
        let err = GradebookImporter::from_reader(Cursor::new(export)).expect_err("bad weight");
        assert!(err.to_string().contains("subject_weight"));
    }
}
