use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::PapersArgs;
use crate::store::PaperStore;

pub fn run(args: PapersArgs) -> Result<()> {
    let listing = PaperStore::new(&args.store_root).list_papers(args.stage)?;
    let paper_count = listing.years.values().map(Vec::len).sum::<usize>();
    info!(
        store_root = %args.store_root.display(),
        stage = args.stage.as_str(),
        years = listing.years.len(),
        papers = paper_count,
        "listed papers"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &listing)
            .context("failed to serialize paper listing json output")?;
        writeln!(output)?;
    } else {
        for (year, codes) in &listing.years {
            writeln!(output, "{year}\t{}", codes.join(", "))?;
        }
    }
    output.flush()?;
    Ok(())
}
