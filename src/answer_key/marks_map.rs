use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use super::pdf_text::PdfTextSource;

/// Question number to full-credit marks.
pub type MarksMap = BTreeMap<u32, f64>;

/// Reads "Q.1 – Q.5 Carry ONE mark each" style declarations from a question
/// paper.
pub struct MarksMapExtractor {
    range_regex: Regex,
}

impl MarksMapExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            range_regex: Regex::new(
                r"(?i)Q\.\s*(\d+)[^\dQ]{0,12}Q\.\s*(\d+)\s*carry\s+(one|two)\s+marks?",
            )
            .context("failed to compile marks range regex")?,
        })
    }

    pub fn extract(
        &self,
        source: &impl PdfTextSource,
        question_paper: Option<&[u8]>,
    ) -> Result<MarksMap> {
        let Some(pdf) = question_paper else {
            return Ok(MarksMap::new());
        };

        let pages = source
            .page_texts(pdf)
            .context("failed to read question paper text")?;
        Ok(self.extract_from_text(&pages.join("\n")))
    }

    /// Later declarations overwrite earlier ones for the same question.
    pub fn extract_from_text(&self, text: &str) -> MarksMap {
        let mut marks = MarksMap::new();

        for captures in self.range_regex.captures_iter(text) {
            let (Some(start), Some(end), Some(amount)) = (
                captures.get(1).and_then(|value| value.as_str().parse::<u32>().ok()),
                captures.get(2).and_then(|value| value.as_str().parse::<u32>().ok()),
                captures.get(3),
            ) else {
                continue;
            };

            let value = if amount.as_str().eq_ignore_ascii_case("two") {
                2.0
            } else {
                1.0
            };

            debug!(start, end, marks = value, "marks range declared");
            for question_no in start..=end {
                marks.insert(question_no, value);
            }
        }

        marks
    }
}
