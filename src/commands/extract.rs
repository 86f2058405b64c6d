use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::answer_key::{MetadataDetector, Pdftotext, VALID_PAPER_CODES, extract_answer_key};
use crate::cli::ExtractArgs;
use crate::model::{PaperMetadata, Schema};
use crate::store::PaperStore;
use crate::util::{read_bytes, write_json_pretty};

pub fn run(args: ExtractArgs) -> Result<()> {
    let answer_key = read_bytes(&args.answer_key)?;
    let question_paper = args
        .question_paper
        .as_deref()
        .map(read_bytes)
        .transpose()?;
    let pdf = Pdftotext::new()?;

    let meta = resolve_metadata(&args, &pdf, &answer_key)?;
    if !meta.paper_code.is_empty() && !is_known_paper_code(&meta.paper_code) {
        warn!(paper_code = %meta.paper_code, "paper code is not a known GATE paper");
    }

    let paper_code = Some(meta.paper_code.as_str()).filter(|code| !code.is_empty());
    let schema = extract_answer_key(&pdf, &answer_key, paper_code, question_paper.as_deref())?;
    if schema.is_empty() {
        warn!(path = %args.answer_key.display(), "answer key produced no entries");
    }
    log_type_counts(&schema);

    if let Some(output) = &args.output {
        write_json_pretty(output, &schema)?;
        info!(path = %output.display(), keys = schema.len(), "wrote schema");
    }

    if let Some(store_root) = &args.store_root {
        if meta.year.is_empty() || meta.paper_code.is_empty() {
            bail!(
                "cannot publish {} without a year and paper code; pass --year and --paper-code",
                args.answer_key.display()
            );
        }
        PaperStore::new(store_root).publish(
            args.stage,
            &meta.year,
            &meta.paper_code,
            &schema,
            &answer_key,
            question_paper.as_deref(),
        )?;
    }

    if args.output.is_none() && args.store_root.is_none() {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &schema)
            .context("failed to serialize schema json output")?;
        writeln!(output)?;
        output.flush()?;
    }

    Ok(())
}

/// Explicit flags win; anything missing is detected from the answer key.
fn resolve_metadata(
    args: &ExtractArgs,
    pdf: &Pdftotext,
    answer_key: &[u8],
) -> Result<PaperMetadata> {
    let mut meta = PaperMetadata {
        year: args.year.clone().unwrap_or_default(),
        paper_code: args
            .paper_code
            .as_deref()
            .map(|code| code.trim().to_ascii_uppercase())
            .unwrap_or_default(),
    };

    if meta.year.is_empty() || meta.paper_code.is_empty() {
        let filename = args.answer_key.file_name().and_then(|name| name.to_str());
        let detected = MetadataDetector::new()?.detect(pdf, answer_key, filename);
        if meta.year.is_empty() {
            meta.year = detected.year;
        }
        if meta.paper_code.is_empty() {
            meta.paper_code = detected.paper_code;
        }
    }

    info!(year = %meta.year, paper_code = %meta.paper_code, "resolved paper metadata");
    Ok(meta)
}

fn is_known_paper_code(code: &str) -> bool {
    let letters = code.trim_end_matches(|c: char| c.is_ascii_digit());
    VALID_PAPER_CODES.contains(&letters)
}

fn log_type_counts(schema: &Schema) {
    let mut counts = BTreeMap::<String, usize>::new();
    for (_, entry) in schema.iter() {
        *counts.entry(entry.question_type.to_string()).or_default() += 1;
    }
    for (question_type, count) in counts {
        info!(question_type = %question_type, count, "schema entries by type");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_digits_do_not_affect_paper_code_check() {
        assert!(is_known_paper_code("CS2"));
        assert!(is_known_paper_code("DA"));
        assert!(!is_known_paper_code("ZZ1"));
        assert!(!is_known_paper_code(""));
    }
}
