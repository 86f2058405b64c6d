use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::model::{QuestionRecord, composite_key};

const QUESTION_BLOCK_CLASS: &str = "questionPnlTbl";
const MENU_TABLE_CLASS: &str = "menu-tbl";
const DEFAULT_STATUS: &str = "Not Attempted";
const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];
const OPTION_SUFFIXES: [char; 4] = ['a', 'b', 'c', 'd'];

struct SectionPattern {
    section: String,
    regex: Regex,
}

struct Selectors {
    block_or_menu: Selector,
    row_table: Selector,
    cell: Selector,
    image: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|error| anyhow!("invalid selector '{css}': {error}"))
}

/// Parses a rendered response sheet into one record per question block.
///
/// Question identity and the option shuffle are only recoverable from image
/// filenames such as `..._cs1q12.png` (identity) and `..._12b.png` (the
/// option with canonical suffix `b`).
pub struct ResponseSheetParser {
    sections: Vec<SectionPattern>,
    selectors: Selectors,
}

impl ResponseSheetParser {
    /// `sections` are the schema's section prefixes; their order decides which
    /// pattern wins when several could match.
    pub fn new<I, S>(sections: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sections = sections
            .into_iter()
            .map(|section| {
                let section = section.as_ref().to_string();
                let pattern = format!(r"_{}\d*q(\d+)", regex::escape(&section.to_lowercase()));
                let regex = Regex::new(&pattern)
                    .with_context(|| format!("failed to compile identity regex for {section}"))?;
                Ok(SectionPattern { section, regex })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sections,
            selectors: Selectors {
                block_or_menu: selector(&format!(
                    "table.{QUESTION_BLOCK_CLASS}, table.{MENU_TABLE_CLASS}"
                ))?,
                row_table: selector("table.questionRowTbl")?,
                cell: selector("td")?,
                image: selector("img")?,
            },
        })
    }

    pub fn parse(&self, html: &str) -> Vec<QuestionRecord> {
        let document = Html::parse_document(html);
        let tables = document
            .root_element()
            .select(&self.selectors.block_or_menu)
            .collect::<Vec<ElementRef<'_>>>();

        // For each position, the first menu table at or after it.
        let mut next_menu = vec![None; tables.len() + 1];
        for index in (0..tables.len()).rev() {
            next_menu[index] = if has_class(tables[index], MENU_TABLE_CLASS) {
                Some(tables[index])
            } else {
                next_menu[index + 1]
            };
        }

        let mut records = Vec::new();
        let mut block_count = 0usize;
        for (index, block) in tables.iter().enumerate() {
            if !has_class(*block, QUESTION_BLOCK_CLASS) {
                continue;
            }
            block_count += 1;

            let record = self.parse_block(*block, next_menu[index + 1]);
            if record.master_ref.is_none() {
                debug!(block = block_count, "dropping question block without identity image");
                continue;
            }
            records.push(record);
        }

        info!(
            blocks = block_count,
            resolved = records.len(),
            "parsed response sheet"
        );
        records
    }

    fn parse_block(&self, block: ElementRef<'_>, menu: Option<ElementRef<'_>>) -> QuestionRecord {
        let mut record = QuestionRecord {
            status: DEFAULT_STATUS.to_string(),
            ..QuestionRecord::default()
        };

        if let Some(menu) = menu {
            self.read_menu_table(menu, &mut record);
        }

        if record.user_answer.is_none() {
            record.user_answer = self.given_answer_from_rows(block);
        }

        record.user_answer = record
            .user_answer
            .take()
            .filter(|answer| !answer.is_empty() && answer != "--");

        let (master_ref, option_map) = self.scan_images(block);
        record.master_ref = master_ref;
        record.option_map = option_map;
        record
    }

    fn read_menu_table(&self, menu: ElementRef<'_>, record: &mut QuestionRecord) {
        let cells = menu.select(&self.selectors.cell).collect::<Vec<_>>();

        for pair in cells.chunks_exact(2) {
            let label = element_text(pair[0]);
            let value = element_text(pair[1]);

            if label.contains("Question ID") {
                record.question_id = Some(value);
            } else if label.contains("Status") {
                record.status = value;
            } else if label.contains("Chosen Option") || label.contains("Given Answer") {
                record.user_answer = Some(value);
            }
        }
    }

    /// NAT blocks carry the answer inside the question's own row table as
    /// `Given Answer :` followed by the value cell.
    fn given_answer_from_rows(&self, block: ElementRef<'_>) -> Option<String> {
        let row_table = block.select(&self.selectors.row_table).next()?;
        let cells = row_table.select(&self.selectors.cell).collect::<Vec<_>>();

        cells.windows(2).find_map(|pair| {
            let text = element_text(pair[0]);
            (text.contains("Given Answer") && text.contains(':')).then(|| element_text(pair[1]))
        })
    }

    fn scan_images(&self, block: ElementRef<'_>) -> (Option<String>, BTreeMap<char, char>) {
        let mut master_ref = None;
        let mut option_map = BTreeMap::new();

        for image in block.select(&self.selectors.image) {
            let name = image_name(image);

            if let Some(label) = enclosing_cell(image).and_then(option_label) {
                if let Some(suffix) = option_suffix(&name) {
                    option_map.insert(label, suffix);
                }
                continue;
            }

            if master_ref.is_none() {
                master_ref = self.resolve_identity(&name.to_lowercase());
            }
        }

        (master_ref, option_map)
    }

    fn resolve_identity(&self, image_name: &str) -> Option<String> {
        self.sections.iter().find_map(|pattern| {
            let number = pattern
                .regex
                .captures(image_name)?
                .get(1)?
                .as_str()
                .parse::<u32>()
                .ok()?;
            Some(composite_key(&pattern.section, number))
        })
    }
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|value| value == class)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text fragments trimmed and concatenated without separators.
fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

fn image_name(image: ElementRef<'_>) -> String {
    let attributes = image.value();
    match attributes.attr("name").filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => attributes
            .attr("src")
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

fn enclosing_cell(image: ElementRef<'_>) -> Option<ElementRef<'_>> {
    image
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "td")
}

/// `A.` or `(A)` at the start of the cell marks an option image.
fn option_label(cell: ElementRef<'_>) -> Option<char> {
    let text = stripped_text(cell);
    OPTION_LABELS.into_iter().find(|label| {
        text.starts_with(&format!("{label}.")) || text.starts_with(&format!("({label})"))
    })
}

/// Last character of the filename stem, when it is one of `a`..`d`.
fn option_suffix(image_name: &str) -> Option<char> {
    let stem = image_name
        .rsplit_once('.')
        .map_or(image_name, |(stem, _)| stem);
    let suffix = stem.chars().last()?.to_ascii_lowercase();
    OPTION_SUFFIXES.contains(&suffix).then_some(suffix)
}
