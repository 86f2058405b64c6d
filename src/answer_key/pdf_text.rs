use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;

/// Shortest line treated as a column header or spread over header columns.
const MIN_ALIGNED_CELLS: usize = 4;

/// Rows of trimmed cells, as laid out on one page.
pub type PdfTable = Vec<Vec<String>>;

/// Text layer of a PDF document.
pub trait PdfTextSource {
    /// One string per page in reading order.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>>;

    /// Tables found on each page, one `Vec` per page.
    fn page_tables(&self, pdf: &[u8]) -> Result<Vec<Vec<PdfTable>>>;
}

/// `PdfTextSource` backed by poppler's `pdftotext`.
pub struct Pdftotext {
    cell_split_regex: Regex,
}

impl Pdftotext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cell_split_regex: Regex::new(r"\t+|\s{2,}")
                .context("failed to compile table cell split regex")?,
        })
    }
}

impl PdfTextSource for Pdftotext {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>> {
        run_pdftotext(pdf, false)
    }

    fn page_tables(&self, pdf: &[u8]) -> Result<Vec<Vec<PdfTable>>> {
        let pages = run_pdftotext(pdf, true)?;
        Ok(pages
            .iter()
            .map(|page| group_layout_tables(page, &self.cell_split_regex))
            .collect())
    }
}

struct TempPdf {
    path: PathBuf,
}

impl TempPdf {
    fn write(pdf: &[u8]) -> Result<Self> {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let path = std::env::temp_dir().join(format!(
            "gatescore_{}_{}.pdf",
            std::process::id(),
            stamp
        ));
        fs::write(&path, pdf)
            .with_context(|| format!("failed to write temp pdf {}", path.display()))?;
        Ok(Self { path })
    }
}

impl Drop for TempPdf {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn run_pdftotext(pdf: &[u8], layout: bool) -> Result<Vec<String>> {
    let temp = TempPdf::write(pdf)?;

    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8");
    if layout {
        command.arg("-layout");
    }
    command.arg(&temp.path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", temp.path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            temp.path.display(),
            stderr.trim()
        );
    }

    Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
}

pub(crate) fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    // pdftotext terminates the last page with a form feed too.
    if pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    pages
}

/// Groups `-layout` lines into tables: consecutive lines splitting into at
/// least two cells. Blank or single-cell lines close the current table, and a
/// column header line always opens a new one.
///
/// Once a header has been seen on the page, rows with fewer cells than the
/// header are spread over its columns by position, so a blank cell stays an
/// empty string instead of shifting the cells after it.
pub(crate) fn group_layout_tables(page: &str, cell_split_regex: &Regex) -> Vec<PdfTable> {
    let mut tables = Vec::<PdfTable>::new();
    let mut current = PdfTable::new();
    let mut header: Option<Vec<Segment>> = None;

    for line in page.lines() {
        let segments = line_segments(line, cell_split_regex);
        if segments.len() < 2 {
            if !current.is_empty() {
                tables.push(std::mem::take(&mut current));
            }
            continue;
        }

        if is_column_header(&segments) {
            if !current.is_empty() {
                tables.push(std::mem::take(&mut current));
            }
            current.push(segments.iter().map(|segment| segment.text.clone()).collect());
            header = Some(segments);
            continue;
        }

        let cells = match &header {
            Some(columns)
                if segments.len() >= MIN_ALIGNED_CELLS && segments.len() < columns.len() =>
            {
                align_to_columns(segments, columns)
            }
            _ => segments.into_iter().map(|segment| segment.text).collect(),
        };
        current.push(cells);
    }

    if !current.is_empty() {
        tables.push(current);
    }

    tables
}

/// A non-empty cell of a layout line; `start` and `width` count characters.
#[derive(Debug, Clone)]
struct Segment {
    start: usize,
    width: usize,
    text: String,
}

impl Segment {
    fn center(&self) -> usize {
        self.start + self.width / 2
    }

    fn end(&self) -> usize {
        self.start + self.width
    }
}

fn line_segments(line: &str, cell_split_regex: &Regex) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for separator in cell_split_regex.find_iter(line) {
        push_segment(&mut segments, line, cursor, separator.start());
        cursor = separator.end();
    }
    push_segment(&mut segments, line, cursor, line.len());
    segments
}

fn push_segment(segments: &mut Vec<Segment>, line: &str, from: usize, to: usize) {
    let raw = &line[from..to];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }

    let leading = raw.len() - raw.trim_start().len();
    segments.push(Segment {
        start: line[..from + leading].chars().count(),
        width: text.chars().count(),
        text: text.to_string(),
    });
}

fn is_column_header(segments: &[Segment]) -> bool {
    segments.len() >= MIN_ALIGNED_CELLS
        && segments
            .first()
            .is_some_and(|first| first.text.contains("No") || first.text.contains("Session"))
}

/// Places each segment in the header column whose span holds its center,
/// keeping segment order and leaving room for the segments still to come.
fn align_to_columns(segments: Vec<Segment>, columns: &[Segment]) -> Vec<String> {
    let boundaries = columns
        .windows(2)
        .map(|pair| (pair[0].end() + pair[1].start) / 2)
        .collect::<Vec<usize>>();

    let mut cells = vec![String::new(); columns.len()];
    let count = segments.len();
    let mut next_free = 0;

    for (index, segment) in segments.into_iter().enumerate() {
        let nearest = boundaries
            .iter()
            .filter(|&&boundary| boundary <= segment.center())
            .count();
        let last_allowed = columns.len() - (count - index);
        let column = nearest.clamp(next_free, last_allowed);

        cells[column] = segment.text;
        next_free = column + 1;
    }

    cells
}
