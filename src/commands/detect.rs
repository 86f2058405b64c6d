use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::answer_key::{MetadataDetector, Pdftotext};
use crate::cli::DetectArgs;
use crate::util::read_bytes;

pub fn run(args: DetectArgs) -> Result<()> {
    let pdf = read_bytes(&args.answer_key)?;
    let filename = args.filename.clone().or_else(|| {
        args.answer_key
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
    });

    let detector = MetadataDetector::new()?;
    let meta = detector.detect(&Pdftotext::new()?, &pdf, filename.as_deref());

    info!(
        path = %args.answer_key.display(),
        year = %meta.year,
        paper_code = %meta.paper_code,
        "detected paper metadata"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &meta)
            .context("failed to serialize metadata json output")?;
        writeln!(output)?;
    } else {
        writeln!(output, "year={}", meta.year)?;
        writeln!(output, "paper_code={}", meta.paper_code)?;
    }
    output.flush()?;
    Ok(())
}
