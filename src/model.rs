use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Mcq,
    Msq,
    Nat,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mcq => "MCQ",
            Self::Msq => "MSQ",
            Self::Nat => "NAT",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for QuestionType {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "MCQ" => Self::Mcq,
            "MSQ" => Self::Msq,
            "NAT" => Self::Nat,
            _ => Self::Other(raw),
        }
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub question_no: u32,
    pub section: String,
    pub original_section: String,
    pub question_type: QuestionType,
    pub key: String,
    pub marks: f64,
}

impl SchemaEntry {
    pub fn composite_key(&self) -> String {
        composite_key(&self.section, self.question_no)
    }
}

pub fn composite_key(section: &str, question_no: u32) -> String {
    format!("{section}_{question_no}")
}

/// Answer key keyed by `"{section}_{question_no}"`.
///
/// Serializes as a plain JSON object so a stored `schema.json` reads back
/// into the same value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    entries: BTreeMap<String, SchemaEntry>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under the entry's composite key, replacing any earlier entry.
    pub fn insert(&mut self, entry: SchemaEntry) -> Option<SchemaEntry> {
        self.entries.insert(entry.composite_key(), entry)
    }

    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaEntry)> {
        self.entries.iter()
    }

    /// Section prefixes of the composite keys, e.g. `{"CS", "GA"}`.
    pub fn sections(&self) -> BTreeSet<String> {
        self.entries
            .keys()
            .filter_map(|key| key.split_once('_').map(|(section, _)| section.to_string()))
            .collect()
    }
}

impl FromIterator<SchemaEntry> for Schema {
    fn from_iter<I: IntoIterator<Item = SchemaEntry>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for entry in iter {
            schema.insert(entry);
        }
        schema
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub year: String,
    pub paper_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRecord {
    pub master_ref: Option<String>,
    pub question_id: Option<String>,
    pub status: String,
    pub user_answer: Option<String>,
    /// Displayed label (`A`..`D`) to canonical option suffix (`a`..`d`).
    pub option_map: BTreeMap<char, char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreResult {
    Correct,
    Wrong,
    Unattempted,
}

impl ScoreResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "Correct",
            Self::Wrong => "Wrong",
            Self::Unattempted => "Unattempted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(rename = "Q")]
    pub master_ref: String,
    #[serde(rename = "Type")]
    pub question_type: QuestionType,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Key")]
    pub display_key: String,
    #[serde(rename = "MasterKey")]
    pub master_key: String,
    #[serde(rename = "Result")]
    pub result: ScoreResult,
    #[serde(rename = "Marks")]
    pub marks_gained: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_questions: usize,
    pub attempted: usize,
    pub correct: usize,
    pub wrong: usize,
    pub total_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub details: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub filename: String,
    pub sha256: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperManifest {
    pub manifest_version: u32,
    pub year: String,
    pub paper_code: String,
    pub stage: String,
    pub generated_at: String,
    pub entry_count: usize,
    pub sections: Vec<String>,
    pub sources: Vec<SourceDocument>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaperListing {
    pub stage: String,
    pub years: BTreeMap<String, Vec<String>>,
}
