use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::Stage;
use crate::model::{PaperListing, PaperManifest, Schema, SourceDocument};
use crate::util::{
    ensure_directory, now_utc_string, read_json, sha256_bytes, write_bytes, write_json_pretty,
};

const SCHEMA_FILE: &str = "schema.json";
const MANIFEST_FILE: &str = "paper.json";
const ANSWER_KEY_FILE: &str = "answer_key.pdf";
const QUESTION_PAPER_FILE: &str = "question_paper.pdf";

/// Local paper store laid out as `<root>/<stage>/<year>/<code>/`.
pub struct PaperStore {
    root: PathBuf,
}

impl PaperStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn paper_dir(&self, stage: Stage, year: &str, paper_code: &str) -> Result<PathBuf> {
        let year = path_component("year", year)?;
        let paper_code = path_component("paper code", paper_code)?.to_ascii_uppercase();
        Ok(self.root.join(stage.as_str()).join(year).join(paper_code))
    }

    pub fn schema_path(&self, stage: Stage, year: &str, paper_code: &str) -> Result<PathBuf> {
        Ok(self.paper_dir(stage, year, paper_code)?.join(SCHEMA_FILE))
    }

    pub fn publish(
        &self,
        stage: Stage,
        year: &str,
        paper_code: &str,
        schema: &Schema,
        answer_key: &[u8],
        question_paper: Option<&[u8]>,
    ) -> Result<PathBuf> {
        let dir = self.paper_dir(stage, year, paper_code)?;
        ensure_directory(&dir)?;

        let mut sources = vec![store_source(&dir, ANSWER_KEY_FILE, answer_key)?];
        if let Some(question_paper) = question_paper {
            sources.push(store_source(&dir, QUESTION_PAPER_FILE, question_paper)?);
        }

        let schema_path = dir.join(SCHEMA_FILE);
        write_json_pretty(&schema_path, schema)?;

        let manifest = PaperManifest {
            manifest_version: 1,
            year: year.trim().to_string(),
            paper_code: paper_code.trim().to_ascii_uppercase(),
            stage: stage.as_str().to_string(),
            generated_at: now_utc_string(),
            entry_count: schema.len(),
            sections: schema.sections().into_iter().collect(),
            sources,
        };
        write_json_pretty(&dir.join(MANIFEST_FILE), &manifest)?;

        info!(
            path = %schema_path.display(),
            stage = stage.as_str(),
            keys = schema.len(),
            "published paper"
        );
        Ok(schema_path)
    }

    pub fn load_schema(&self, stage: Stage, year: &str, paper_code: &str) -> Result<Schema> {
        let path = self.schema_path(stage, year, paper_code)?;
        if !path.exists() {
            bail!(
                "paper {} ({}) not found in {} store at {}",
                paper_code,
                year,
                stage.as_str(),
                path.display()
            );
        }
        read_json(&path)
    }

    /// Years and the paper codes under them that have a schema.
    pub fn list_papers(&self, stage: Stage) -> Result<PaperListing> {
        let stage_dir = self.root.join(stage.as_str());
        let mut listing = PaperListing {
            stage: stage.as_str().to_string(),
            ..PaperListing::default()
        };

        if !stage_dir.exists() {
            warn!(path = %stage_dir.display(), "store stage directory missing");
            return Ok(listing);
        }

        for year_dir in sorted_subdirectories(&stage_dir)? {
            let codes = sorted_subdirectories(&year_dir)?
                .into_iter()
                .filter(|code_dir| code_dir.join(SCHEMA_FILE).exists())
                .filter_map(|code_dir| file_name(&code_dir))
                .collect::<Vec<String>>();

            if let Some(year) = file_name(&year_dir) {
                listing.years.insert(year, codes);
            }
        }

        Ok(listing)
    }
}

fn store_source(dir: &Path, filename: &str, data: &[u8]) -> Result<SourceDocument> {
    write_bytes(&dir.join(filename), data)?;
    Ok(SourceDocument {
        filename: filename.to_string(),
        sha256: sha256_bytes(data),
        bytes: data.len(),
    })
}

fn path_component<'a>(label: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{label} is required");
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        bail!("invalid {label} '{value}'");
    }
    Ok(value)
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionType, SchemaEntry};

    fn sample_schema() -> Schema {
        Schema::from_iter([SchemaEntry {
            question_no: 1,
            section: "GA".to_string(),
            original_section: "General Aptitude".to_string(),
            question_type: QuestionType::Mcq,
            key: "B".to_string(),
            marks: 1.0,
        }])
    }

    #[test]
    fn publish_then_load_returns_same_schema() {
        let root = tempfile::tempdir().unwrap();
        let store = PaperStore::new(root.path());
        let schema = sample_schema();

        let path = store
            .publish(Stage::Live, "2025", "cs1", &schema, b"%PDF-key", Some(b"%PDF-qp".as_slice()))
            .unwrap();

        assert!(path.ends_with("live/2025/CS1/schema.json"));
        assert_eq!(store.load_schema(Stage::Live, "2025", "CS1").unwrap(), schema);

        let manifest: PaperManifest =
            read_json(&root.path().join("live/2025/CS1/paper.json")).unwrap();
        assert_eq!(manifest.entry_count, 1);
        assert_eq!(manifest.sources.len(), 2);
        assert_eq!(manifest.sources[0].sha256, sha256_bytes(b"%PDF-key"));
    }

    #[test]
    fn missing_paper_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let store = PaperStore::new(root.path());

        let error = store.load_schema(Stage::Live, "2024", "DA").unwrap_err();
        assert!(error.to_string().contains("not found in live store"));
    }

    #[test]
    fn list_papers_only_reports_codes_with_schema() {
        let root = tempfile::tempdir().unwrap();
        let store = PaperStore::new(root.path());
        let schema = sample_schema();

        store
            .publish(Stage::Live, "2025", "DA", &schema, b"%PDF", None)
            .unwrap();
        store
            .publish(Stage::Live, "2024", "CS2", &schema, b"%PDF", None)
            .unwrap();
        store
            .publish(Stage::Staging, "2025", "ME", &schema, b"%PDF", None)
            .unwrap();
        fs::create_dir_all(root.path().join("live/2025/EE")).unwrap();

        let listing = store.list_papers(Stage::Live).unwrap();
        assert_eq!(listing.years.keys().collect::<Vec<_>>(), vec!["2024", "2025"]);
        assert_eq!(listing.years["2025"], vec!["DA".to_string()]);
        assert_eq!(listing.years["2024"], vec!["CS2".to_string()]);

        let empty = PaperStore::new(root.path().join("nothing"))
            .list_papers(Stage::Live)
            .unwrap();
        assert!(empty.years.is_empty());
    }

    #[test]
    fn rejects_path_like_components() {
        let store = PaperStore::new("data");

        assert!(store.paper_dir(Stage::Live, "../2025", "CS").is_err());
        assert!(store.paper_dir(Stage::Live, "2025", "").is_err());
    }
}
