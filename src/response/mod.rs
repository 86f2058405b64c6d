//! Candidate response sheets: fetching and parsing.

mod fetch;
mod sheet_parser;
#[cfg(test)]
mod tests;

pub use fetch::{HttpFetcher, ResponseFetcher, ResponseSource};
pub use sheet_parser::ResponseSheetParser;
