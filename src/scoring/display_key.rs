use std::collections::BTreeMap;

use crate::model::{QuestionType, SchemaEntry};

/// Splits a `;`- or `,`-separated option list into trimmed, non-empty parts.
pub fn split_options(value: &str) -> Vec<String> {
    value
        .split([';', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn sorted_options(value: &str) -> Vec<String> {
    let mut options = split_options(value);
    options.sort();
    options
}

/// Expresses the schema key in the candidate's displayed option labels.
///
/// Without shuffle information MCQ keys are returned verbatim and MSQ keys as
/// their sorted parts; NAT keys never change.
pub fn resolve_display_key(entry: &SchemaEntry, option_map: &BTreeMap<char, char>) -> String {
    match entry.question_type {
        QuestionType::Mcq => {
            let target = entry.key.trim().to_lowercase();
            option_map
                .iter()
                .find(|(_, suffix)| suffix.to_string() == target)
                .map(|(label, _)| label.to_string())
                .unwrap_or_else(|| entry.key.clone())
        }
        QuestionType::Msq => {
            let mut labels = Vec::new();
            for suffix in split_options(&entry.key.to_lowercase()) {
                labels.extend(
                    option_map
                        .iter()
                        .filter(|(_, mapped)| mapped.to_string() == suffix)
                        .map(|(label, _)| label.to_string()),
                );
            }

            if labels.is_empty() {
                sorted_options(&entry.key).join(";")
            } else {
                labels.sort();
                labels.join(";")
            }
        }
        QuestionType::Nat | QuestionType::Other(_) => entry.key.clone(),
    }
}

/// Parses `"low to high"` or a single value used as both bounds.
pub fn parse_nat_range(key: &str) -> Option<(f64, f64)> {
    let parts = key.split(" to ").collect::<Vec<&str>>();
    match parts.as_slice() {
        [low, high] => Some((low.trim().parse().ok()?, high.trim().parse().ok()?)),
        _ => {
            let value = key.trim().parse().ok()?;
            Some((value, value))
        }
    }
}
