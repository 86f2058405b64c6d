use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::pdf_text::PdfTextSource;
use crate::model::PaperMetadata;

pub const VALID_PAPER_CODES: [&str; 30] = [
    "AE", "AG", "AR", "BM", "BT", "CE", "CH", "CS", "CY", "DA", "EC", "EE", "ES", "EY", "GE",
    "GG", "IN", "MA", "ME", "MN", "MT", "NM", "PE", "PH", "PI", "ST", "TF", "XE", "XH", "XL",
];

/// One pattern in a fallback cascade.
struct PatternStrategy {
    name: &'static str,
    regex: Regex,
    render: fn(&Captures<'_>) -> Option<String>,
}

impl PatternStrategy {
    fn new(
        name: &'static str,
        pattern: &str,
        render: fn(&Captures<'_>) -> Option<String>,
    ) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("failed to compile {name} metadata regex"))?;
        Ok(Self {
            name,
            regex,
            render,
        })
    }

    fn apply(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|captures| (self.render)(&captures))
    }
}

/// Tries each strategy in order and returns the first rendered match.
fn first_match(strategies: &[PatternStrategy], text: &str) -> Option<String> {
    strategies.iter().find_map(|strategy| {
        let value = strategy.apply(text)?;
        debug!(strategy = strategy.name, value = %value, "metadata pattern matched");
        Some(value)
    })
}

fn group_one(captures: &Captures<'_>) -> Option<String> {
    captures.get(1).map(|value| value.as_str().to_string())
}

fn group_one_upper(captures: &Captures<'_>) -> Option<String> {
    captures.get(1).map(|value| value.as_str().to_ascii_uppercase())
}

fn short_year(captures: &Captures<'_>) -> Option<String> {
    captures.get(2).map(|digits| format!("20{}", digits.as_str()))
}

/// Infers year and paper code from an answer-key document, falling back to
/// its filename. Unresolved fields stay empty.
pub struct MetadataDetector {
    text_year: Vec<PatternStrategy>,
    text_code: Vec<PatternStrategy>,
    session_regex: Regex,
    filename_year: Vec<PatternStrategy>,
    filename_code_with_digit: Regex,
    filename_code: Regex,
}

impl MetadataDetector {
    pub fn new() -> Result<Self> {
        let codes = VALID_PAPER_CODES.join("|");

        Ok(Self {
            text_year: vec![
                PatternStrategy::new("gate_year", r"(?i)GATE\s?(\d{4})", group_one)?,
                PatternStrategy::new("bare_year", r"\b(202\d)\b", group_one)?,
            ],
            text_code: vec![
                PatternStrategy::new(
                    "answer_key_title",
                    r"Answer Key for .* \(([A-Z]{2}\d?)\)",
                    group_one_upper,
                )?,
                PatternStrategy::new(
                    "paper_code_label",
                    r"(?i)(?:Paper )?Code\s?:\s?([A-Z]{2}\d?)",
                    group_one_upper,
                )?,
                PatternStrategy::new(
                    "subject_label",
                    r"(?i)Subject\s?:\s?.* \(([A-Z]{2}\d?)\)",
                    group_one_upper,
                )?,
                PatternStrategy::new(
                    "parenthesized_code",
                    &format!(r"(?i)\((({codes})\d?)\)"),
                    group_one_upper,
                )?,
            ],
            session_regex: Regex::new(r"(?i)(?:Session|Shift)\s?(\d)")
                .context("failed to compile session regex")?,
            filename_year: vec![
                PatternStrategy::new("code_short_year", r"([A-Z]{2})(\d{2})", short_year)?,
                PatternStrategy::new("gate_full_year", r"(?i)GATE[-_]?\s?(20\d{2})", group_one)?,
            ],
            filename_code_with_digit: Regex::new(&format!(r"(?i)({codes})([1-9])"))
                .context("failed to compile filename session code regex")?,
            filename_code: Regex::new(&format!(r"(?i)({codes})"))
                .context("failed to compile filename code regex")?,
        })
    }

    /// Reads the first page of `pdf` and runs the full cascade. A document
    /// whose text cannot be read still gets the filename fallbacks.
    pub fn detect(
        &self,
        source: &impl PdfTextSource,
        pdf: &[u8],
        filename: Option<&str>,
    ) -> PaperMetadata {
        let first_page = match source.page_texts(pdf) {
            Ok(pages) => pages.into_iter().next(),
            Err(error) => {
                warn!(error = %error, "failed to read answer key text; using filename only");
                None
            }
        };

        self.detect_from_text(first_page.as_deref(), filename)
    }

    pub fn detect_from_text(
        &self,
        first_page: Option<&str>,
        filename: Option<&str>,
    ) -> PaperMetadata {
        let mut meta = PaperMetadata::default();

        if let Some(text) = first_page.filter(|text| !text.trim().is_empty()) {
            meta.year = first_match(&self.text_year, text).unwrap_or_default();
            meta.paper_code = first_match(&self.text_code, text).unwrap_or_default();

            if !meta.paper_code.is_empty()
                && !meta.paper_code.ends_with(|character: char| character.is_ascii_digit())
                && let Some(session) = self.session_regex.captures(text).and_then(|c| c.get(1))
            {
                meta.paper_code.push_str(session.as_str());
            }
        }

        if let Some(filename) = filename.filter(|name| !name.is_empty()) {
            if meta.year.is_empty() {
                meta.year = first_match(&self.filename_year, filename).unwrap_or_default();
            }
            if meta.paper_code.is_empty() {
                meta.paper_code = self.code_from_filename(filename).unwrap_or_default();
            }
        }

        meta
    }

    /// Prefers `<CODE><digit>` where the digit is not followed by another
    /// digit, so `DA25` never reads as `DA2`.
    fn code_from_filename(&self, filename: &str) -> Option<String> {
        for captures in self.filename_code_with_digit.captures_iter(filename) {
            let (Some(whole), Some(code), Some(session)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };

            let followed_by_digit = filename[whole.end()..]
                .chars()
                .next()
                .is_some_and(|character| character.is_ascii_digit());
            if !followed_by_digit {
                return Some(format!(
                    "{}{}",
                    code.as_str().to_ascii_uppercase(),
                    session.as_str()
                ));
            }
        }

        self.filename_code
            .find(filename)
            .map(|code| code.as_str().to_ascii_uppercase())
    }
}
