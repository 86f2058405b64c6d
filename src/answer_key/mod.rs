//! Answer-key side of the pipeline: PDF text layer, exam metadata, marks
//! declarations and the canonical schema.

mod marks_map;
mod metadata;
mod pdf_text;
mod schema_builder;

pub use metadata::{MetadataDetector, VALID_PAPER_CODES};
pub use pdf_text::Pdftotext;
pub use schema_builder::extract_answer_key;

#[cfg(test)]
use marks_map::{MarksMap, MarksMapExtractor};
#[cfg(test)]
use pdf_text::{PdfTable, PdfTextSource, group_layout_tables, split_pages};
#[cfg(test)]
use schema_builder::{AnswerKeySchemaBuilder, RowLayout};
