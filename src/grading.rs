use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::interpret::normalize_answers;
use crate::types::Answer;

#[derive(Debug)]
pub enum AnswerKeyError {
    Read(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
}

impl std::fmt::Display for AnswerKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerKeyError::Read(path, e) => {
                write!(f, "cannot read answer key {}: {}", path.display(), e)
            }
            AnswerKeyError::Parse(path, e) => {
                write!(f, "cannot parse answer key {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for AnswerKeyError {}

/// The correct answers for a sheet, one per question. A `NoAnswer` entry
/// means the question has no key and is not scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerKey {
    pub answers: Vec<Answer>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerKeyFile {
    Object { answers: Vec<Answer> },
    List(Vec<Answer>),
}

impl AnswerKey {
    /// Reads a key written either as `{"answers": [...]}` or as a bare
    /// array. Entries may be indices (`2`), index lists (`[0, 1]`), `-1`,
    /// or letters (`"c"`, `"ab"`).
    pub fn from_json_file(path: &Path) -> Result<Self, AnswerKeyError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| AnswerKeyError::Read(path.to_path_buf(), e))?;
        let file: AnswerKeyFile =
            serde_json::from_str(&json).map_err(|e| AnswerKeyError::Parse(path.to_path_buf(), e))?;
        let answers = match file {
            AnswerKeyFile::Object { answers } | AnswerKeyFile::List(answers) => answers,
        };
        Ok(Self { answers })
    }

    /// Pads or truncates the key to the sheet's question count.
    pub fn normalized(self, total_questions: usize) -> Self {
        Self {
            answers: normalize_answers(self.answers, total_questions),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionStatus {
    Correct,
    Incorrect,
    NoKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    /// 1-based question number.
    pub question: usize,
    pub status: QuestionStatus,
    pub student_answer: Answer,
    pub correct_answer: Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeReport {
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
    pub questions: Vec<QuestionResult>,
}

/// Compares a sheet's answers with the key, question by question, up to the
/// shorter of the two. A multiple-choice key is only matched by exactly the
/// same set of choices.
pub fn grade_sheet(student: &[Answer], key: &AnswerKey) -> GradeReport {
    let questions = student
        .iter()
        .zip(&key.answers)
        .enumerate()
        .map(|(i, (student_answer, correct_answer))| {
            let status = if !correct_answer.is_answered() {
                QuestionStatus::NoKey
            } else if student_answer == correct_answer {
                QuestionStatus::Correct
            } else {
                QuestionStatus::Incorrect
            };
            QuestionResult {
                question: i + 1,
                status,
                student_answer: student_answer.clone(),
                correct_answer: correct_answer.clone(),
            }
        })
        .collect::<Vec<QuestionResult>>();

    let score = questions
        .iter()
        .filter(|q| q.status == QuestionStatus::Correct)
        .count();
    let total = key.answers.len();
    let percentage = if total > 0 {
        (score as f64 / total as f64 * 10000.0).round() / 100.0
    } else {
        0.0
    };

    GradeReport {
        score,
        total,
        percentage,
        questions,
    }
}

/// One line of the per-sheet score table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    #[serde(rename = "Sheet Name")]
    pub sheet_name: String,
    #[serde(rename = "Score")]
    pub score: usize,
    #[serde(rename = "Total Questions")]
    pub total_questions: usize,
    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

impl SheetSummary {
    pub fn new(path: &Path, report: &GradeReport) -> Self {
        Self {
            sheet_name: path
                .file_name()
                .unwrap_or(path.as_os_str())
                .to_string_lossy()
                .into_owned(),
            score: report.score,
            total_questions: report.total,
            percentage: report.percentage,
        }
    }
}

/// Writes the score table as CSV with a header row.
pub fn write_summary_csv<W: std::io::Write>(
    writer: W,
    summaries: &[SheetSummary],
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for summary in summaries {
        wtr.serialize(summary)?;
    }
    wtr.flush()?;
    Ok(())
}
