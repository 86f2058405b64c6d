//! Marking scheme: display-key resolution and per-type grading.

mod calculator;
mod display_key;

pub use calculator::score_document;

#[cfg(test)]
use calculator::ScoreCalculator;
#[cfg(test)]
use display_key::{parse_nat_range, resolve_display_key};
