use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{ScoreArgs, Stage};
use crate::model::{Report, Schema};
use crate::response::{HttpFetcher, ResponseSource};
use crate::scoring::score_document;
use crate::store::PaperStore;
use crate::util::{read_bytes, read_json, write_json_pretty};

pub fn run(args: ScoreArgs) -> Result<()> {
    let schema = load_schema(&args)?;
    let source = response_source(&args.response)?;

    let report = score_document(&schema, source, &HttpFetcher::new()?)?;

    if let Some(output) = &args.output {
        write_json_pretty(output, &report)?;
        info!(path = %output.display(), "wrote score report");
    }

    if args.json {
        write_json_report(&report)
    } else {
        write_text_report(&report)
    }
}

fn load_schema(args: &ScoreArgs) -> Result<Schema> {
    if let Some(path) = &args.schema {
        let schema: Schema = read_json(path)?;
        info!(path = %path.display(), keys = schema.len(), "loaded schema");
        return Ok(schema);
    }

    match (&args.year, &args.paper_code) {
        (Some(year), Some(paper_code)) => {
            PaperStore::new(&args.store_root).load_schema(Stage::Live, year, paper_code)
        }
        _ => bail!("either --schema or both --year and --paper-code are required"),
    }
}

fn response_source(response: &str) -> Result<ResponseSource> {
    if ResponseSource::is_url(response) {
        return Ok(ResponseSource::Url(response.to_string()));
    }

    let raw = read_bytes(Path::new(response))?;
    let html = String::from_utf8_lossy(&raw).into_owned();
    Ok(ResponseSource::Html(html))
}

fn write_json_report(report: &Report) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize score report json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_report(report: &Report) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    render_text_report(&mut output, report)?;
    output.flush()?;
    Ok(())
}

fn render_text_report(output: &mut impl Write, report: &Report) -> Result<()> {
    let summary = &report.summary;
    writeln!(
        output,
        "Questions: {} attempted={} correct={} wrong={}",
        summary.total_questions, summary.attempted, summary.correct, summary.wrong
    )?;
    writeln!(output, "Total score: {:.2}", summary.total_score)?;

    for detail in &report.details {
        writeln!(
            output,
            "{}\t{}\t{}\tuser={}\tkey={}\tmaster={}\t{:+.2}",
            detail.master_ref,
            detail.question_type,
            detail.result.as_str(),
            detail.user,
            detail.display_key,
            detail.master_key,
            detail.marks_gained,
        )?;
    }

    Ok(())
}
