use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use super::marks_map::{MarksMap, MarksMapExtractor};
use super::pdf_text::{PdfTable, PdfTextSource};
use crate::model::{QuestionType, Schema, SchemaEntry};

const DEFAULT_MARKS: f64 = 1.0;

/// Column arrangement of an answer-key row, chosen by cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLayout {
    /// `[q_no, session, type, section, key, marks, ...]`
    Legacy,
    /// `[q_no, type, section, key, ...]`; marks come from the question paper.
    Current,
}

impl RowLayout {
    pub fn classify(cell_count: usize) -> Option<Self> {
        match cell_count {
            0..=3 => None,
            4 | 5 => Some(Self::Current),
            _ => Some(Self::Legacy),
        }
    }
}

struct RawRow<'a> {
    question_no: &'a str,
    question_type: &'a str,
    section: &'a str,
    key: &'a str,
    marks: Option<&'a str>,
}

impl<'a> RawRow<'a> {
    fn split(row: &'a [String], layout: RowLayout) -> Self {
        match layout {
            RowLayout::Legacy => Self {
                question_no: &row[0],
                question_type: &row[2],
                section: &row[3],
                key: &row[4],
                marks: Some(&row[5]),
            },
            RowLayout::Current => Self {
                question_no: &row[0],
                question_type: &row[1],
                section: &row[2],
                key: &row[3],
                marks: None,
            },
        }
    }
}

pub struct AnswerKeySchemaBuilder {
    paper_code: Option<String>,
    marks_map: MarksMap,
}

impl AnswerKeySchemaBuilder {
    pub fn new(paper_code: Option<&str>) -> Self {
        Self {
            paper_code: paper_code
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(ToOwned::to_owned),
            marks_map: MarksMap::new(),
        }
    }

    pub fn with_marks_map(mut self, marks_map: MarksMap) -> Self {
        self.marks_map = marks_map;
        self
    }

    /// Builds the schema from the tables of every page. Header rows are
    /// skipped wherever they appear; duplicate composite keys keep the last
    /// row seen.
    pub fn build_from_tables(&self, pages: &[Vec<PdfTable>]) -> Result<Schema> {
        let mut schema = Schema::new();
        let mut skipped_rows = 0usize;

        for (page_index, tables) in pages.iter().enumerate() {
            for table in tables {
                for (row_index, row) in table.iter().enumerate() {
                    if is_header_row(row) {
                        continue;
                    }
                    let Some(layout) = RowLayout::classify(row.len()) else {
                        skipped_rows += 1;
                        continue;
                    };

                    let entry = self.build_entry(row, layout).with_context(|| {
                        format!(
                            "failed to parse answer key row {} on page {}: {:?}",
                            row_index + 1,
                            page_index + 1,
                            row
                        )
                    })?;
                    schema.insert(entry);
                }
            }
        }

        debug!(skipped_rows, "answer key rows without a recognized layout");
        Ok(schema)
    }

    fn build_entry(&self, row: &[String], layout: RowLayout) -> Result<SchemaEntry> {
        let raw = RawRow::split(row, layout);

        let question_no = parse_question_no(raw.question_no)?;
        if layout == RowLayout::Current && raw.question_type.trim().parse::<u32>().is_ok() {
            bail!(
                "question type '{}' is numeric; row is missing a cell",
                raw.question_type.trim()
            );
        }
        let marks = match raw.marks {
            Some(cell) => parse_marks(cell)?,
            None => self
                .marks_map
                .get(&question_no)
                .copied()
                .unwrap_or(DEFAULT_MARKS),
        };

        let original_section = raw.section.trim().to_string();
        Ok(SchemaEntry {
            question_no,
            section: self.normalize_section(&original_section),
            original_section,
            question_type: QuestionType::from(raw.question_type.trim().to_string()),
            key: raw.key.trim().to_string(),
            marks,
        })
    }

    fn normalize_section(&self, raw_section: &str) -> String {
        let lower = raw_section.to_lowercase();
        if lower.contains("general aptitude") {
            return "GA".to_string();
        }

        match &self.paper_code {
            Some(code) if lower != "ga" => code.clone(),
            _ => raw_section.to_string(),
        }
    }
}

fn is_header_row(row: &[String]) -> bool {
    row.first()
        .is_some_and(|cell| cell.contains("No") || cell.contains("Session"))
}

fn parse_question_no(cell: &str) -> Result<u32> {
    let value = cell
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid question number '{}'", cell.trim()))?;
    if value == 0 {
        bail!("question number must be positive");
    }
    Ok(value)
}

fn parse_marks(cell: &str) -> Result<f64> {
    let value = cell
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid marks value '{}'", cell.trim()))?;
    if value.is_nan() || value <= 0.0 {
        bail!("marks must be positive, got {value}");
    }
    Ok(value)
}

/// Runs the whole answer-key pipeline: table extraction, the marks map when a
/// row needs it, and schema construction.
pub fn extract_answer_key(
    source: &impl PdfTextSource,
    answer_key: &[u8],
    paper_code: Option<&str>,
    question_paper: Option<&[u8]>,
) -> Result<Schema> {
    let pages = source
        .page_tables(answer_key)
        .context("failed to read answer key tables")?;

    let needs_marks_map = pages
        .iter()
        .flatten()
        .flatten()
        .any(|row| RowLayout::classify(row.len()) == Some(RowLayout::Current));

    let mut builder = AnswerKeySchemaBuilder::new(paper_code);
    if needs_marks_map {
        let marks_map = MarksMapExtractor::new()?.extract(source, question_paper)?;
        debug!(declared = marks_map.len(), "loaded marks map");
        builder = builder.with_marks_map(marks_map);
    }

    let schema = builder.build_from_tables(&pages)?;
    info!(
        keys = schema.len(),
        pages = pages.len(),
        paper_code = paper_code.unwrap_or_default(),
        "extracted answer key"
    );

    Ok(schema)
}
