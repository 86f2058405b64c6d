use anyhow::{Context, Result};
use tracing::{debug, info};

use super::display_key::{parse_nat_range, resolve_display_key, sorted_options};
use crate::model::{
    QuestionRecord, QuestionType, Report, ReportEntry, ReportSummary, Schema, SchemaEntry,
    ScoreResult,
};
use crate::response::{ResponseFetcher, ResponseSheetParser, ResponseSource};

const NOT_ATTEMPTED: &str = "Not Attempted";
const NAT_UPPER_TOLERANCE: f64 = 1e-9;

/// Joins parsed response records with a schema and applies the marking
/// scheme.
pub struct ScoreCalculator<'a> {
    schema: &'a Schema,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn score(&self, records: &[QuestionRecord]) -> Report {
        let mut summary = ReportSummary::default();
        let mut details = Vec::new();

        for record in records {
            let Some(master_ref) = record.master_ref.as_deref() else {
                continue;
            };
            let Some(entry) = self.schema.get(master_ref) else {
                debug!(
                    master_ref,
                    question_id = record.question_id.as_deref().unwrap_or_default(),
                    "response question missing from schema"
                );
                continue;
            };
            if let QuestionType::Other(raw) = &entry.question_type {
                debug!(master_ref, question_type = %raw, "skipping unrecognized question type");
                continue;
            }

            let display_key = resolve_display_key(entry, &record.option_map);
            let (user, result, marks_gained) = match record.user_answer.as_deref() {
                None => (NOT_ATTEMPTED.to_string(), ScoreResult::Unattempted, 0.0),
                Some(answer) => {
                    let (result, marks) = grade(entry, answer, &display_key);
                    summary.attempted += 1;
                    if result == ScoreResult::Correct {
                        summary.correct += 1;
                    } else {
                        summary.wrong += 1;
                    }
                    (answer.to_string(), result, marks)
                }
            };

            summary.total_score += marks_gained;
            details.push(ReportEntry {
                master_ref: master_ref.to_string(),
                question_type: entry.question_type.clone(),
                status: record.status.clone(),
                user,
                display_key,
                master_key: entry.key.clone(),
                result,
                marks_gained,
            });
        }

        summary.total_questions = details.len();
        info!(
            questions = summary.total_questions,
            attempted = summary.attempted,
            correct = summary.correct,
            wrong = summary.wrong,
            total_score = summary.total_score,
            "scored response sheet"
        );

        Report { summary, details }
    }
}

fn grade(entry: &SchemaEntry, answer: &str, display_key: &str) -> (ScoreResult, f64) {
    let correct = match entry.question_type {
        QuestionType::Mcq => answer == display_key,
        QuestionType::Msq => sorted_options(answer) == sorted_options(display_key),
        QuestionType::Nat => nat_in_range(answer, &entry.key),
        QuestionType::Other(_) => false,
    };

    if correct {
        (ScoreResult::Correct, entry.marks)
    } else {
        (ScoreResult::Wrong, wrong_answer_marks(entry))
    }
}

/// Only MCQs carry negative marks, and only for the 1- and 2-mark tiers.
fn wrong_answer_marks(entry: &SchemaEntry) -> f64 {
    match entry.question_type {
        QuestionType::Mcq if entry.marks == 1.0 => -1.0 / 3.0,
        QuestionType::Mcq if entry.marks == 2.0 => -2.0 / 3.0,
        _ => 0.0,
    }
}

fn nat_in_range(answer: &str, key: &str) -> bool {
    let Ok(value) = answer.trim().parse::<f64>() else {
        return false;
    };
    parse_nat_range(key)
        .is_some_and(|(low, high)| low <= value && value <= high + NAT_UPPER_TOLERANCE)
}

/// Resolves the response sheet (fetching it when given a URL), parses it
/// against the schema's sections and scores it. A fetch failure is the only
/// error.
pub fn score_document(
    schema: &Schema,
    source: ResponseSource,
    fetcher: &impl ResponseFetcher,
) -> Result<Report> {
    let html = source
        .into_html(fetcher)
        .context("failed to load response sheet")?;
    let parser = ResponseSheetParser::new(schema.sections())?;
    let records = parser.parse(&html);

    Ok(ScoreCalculator::new(schema).score(&records))
}
