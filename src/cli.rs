use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "gatescore",
    version,
    about = "Answer-key extraction and response sheet scoring for GATE papers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Detect(DetectArgs),
    Extract(ExtractArgs),
    Score(ScoreArgs),
    Papers(PapersArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Stage {
    Live,
    Staging,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Staging => "staging",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[arg(long)]
    pub answer_key: PathBuf,

    /// Name used for filename fallbacks; defaults to the answer key's name.
    #[arg(long)]
    pub filename: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub answer_key: PathBuf,

    #[arg(long)]
    pub question_paper: Option<PathBuf>,

    #[arg(long)]
    pub paper_code: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Publish into the paper store rooted here.
    #[arg(long)]
    pub store_root: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Stage::Staging)]
    pub stage: Stage,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Response sheet HTML file, or an http(s) URL to fetch.
    #[arg(long)]
    pub response: String,

    #[arg(long, conflicts_with_all = ["year", "paper_code"])]
    pub schema: Option<PathBuf>,

    #[arg(long, requires = "paper_code")]
    pub year: Option<String>,

    #[arg(long, requires = "year")]
    pub paper_code: Option<String>,

    #[arg(long, default_value = "data")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PapersArgs {
    #[arg(long, default_value = "data")]
    pub store_root: PathBuf,

    #[arg(long, value_enum, default_value_t = Stage::Live)]
    pub stage: Stage,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
