//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// ctigraph - Extract STIX-style knowledge graph triples from threat reports.
#[derive(Debug, Parser)]
#[command(name = "ctigraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extractor/validation settings (TOML)
    #[arg(short, long, global = true, env = "CTIGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ontology file (TOML) replacing the built-in STIX vocabulary
    #[arg(long, global = true, env = "CTIGRAPH_ONTOLOGY")]
    pub ontology: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (output paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep ontology-relevant sentences and render one prompt each
    Prefilter(PrefilterArgs),

    /// Run sentence prompts through the model and merge the triples
    Extract(ExtractArgs),

    /// Extract from a whole document (single-shot, then windows)
    Scan(ScanArgs),

    /// Split triples into ontology-valid and invalid sets
    Validate(ValidateArgs),

    /// Keep the best few valid triples per paragraph
    Select(SelectArgs),
}

/// Where the source document comes from.
#[derive(Debug, Args)]
pub struct DocumentArgs {
    /// Decomposed document (page → paragraph JSON)
    #[arg(long, env = "PARAGRAPHS_JSON", default_value = "page_paragraphs.json")]
    pub paragraphs: PathBuf,

    /// Plain-text document; replaces --paragraphs
    #[arg(long)]
    pub text: Option<PathBuf>,
}

/// Connection to the Ollama service.
#[derive(Debug, Args)]
pub struct OllamaArgs {
    /// Ollama base URL
    #[arg(long = "ollama-url", env = "OLLAMA_URL", default_value = "http://127.0.0.1:11434")]
    pub url: String,

    /// Model name
    #[arg(long, env = "OLLAMA_MODEL", default_value = "gemma2:9b")]
    pub model: String,

    /// Per-call timeout in seconds (defaults to the configured extraction timeout)
    #[arg(long, env = "OLLAMA_TIMEOUT")]
    pub timeout: Option<u64>,
}

/// Arguments for the prefilter command.
#[derive(Debug, Parser)]
pub struct PrefilterArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Kept sentences with their entities
    #[arg(long, env = "FILTERED_JSON", default_value = "filtered_sentences.json")]
    pub filtered: PathBuf,

    /// One prompt record per line
    #[arg(long, env = "INPUTS", default_value = "inputs.jsonl")]
    pub inputs: PathBuf,

    /// Also require a verb in each kept sentence
    #[arg(long)]
    pub require_verb: bool,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Prompt records (JSON lines)
    #[arg(long, env = "INPUTS", default_value = "inputs.jsonl")]
    pub inputs: PathBuf,

    /// Sentence texts for records that lack them; skipped when absent
    #[arg(long, env = "FILTERED_JSON", default_value = "filtered_sentences.json")]
    pub filtered: PathBuf,

    /// Paragraph texts for records that lack them; skipped when absent
    #[arg(long, env = "PARAGRAPHS_JSON", default_value = "page_paragraphs.json")]
    pub paragraphs: PathBuf,

    /// Merged triples output
    #[arg(short, long, env = "MERGED", default_value = "triples_merged.json")]
    pub out: PathBuf,

    /// Completion calls in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Ask the model whether each triple is supported by its text
    #[arg(long)]
    pub validate_support: bool,

    #[command(flatten)]
    pub ollama: OllamaArgs,
}

/// Arguments for the scan command.
#[derive(Debug, Parser)]
pub struct ScanArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    /// Scan output
    #[arg(short, long, default_value = "triples_full_doc_scan.json")]
    pub out: PathBuf,

    /// Largest document sent as one prompt (0 = always try one prompt first)
    #[arg(long, env = "MAX_DOC_CHARS")]
    pub max_doc_chars: Option<usize>,

    /// Ask the model whether each triple is supported by its window
    #[arg(long)]
    pub validate_support: bool,

    #[command(flatten)]
    pub ollama: OllamaArgs,
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Triples to check (`{"triples": [...]}` or a bare list)
    #[arg(short, long, env = "IN_PATH", default_value = "triples_merged.json")]
    pub input: PathBuf,

    /// Valid triples output
    #[arg(long, env = "OUT_OK", default_value = "triples_valid.json")]
    pub out_ok: PathBuf,

    /// Invalid triples output, with reasons
    #[arg(long, env = "OUT_BAD", default_value = "triples_invalid.json")]
    pub out_bad: PathBuf,

    /// Longest allowed name or predicate
    #[arg(long, env = "MAX_STR_LEN")]
    pub max_str_len: Option<usize>,

    /// Skip the per-predicate subject/object type rules
    #[arg(long)]
    pub no_domain_range: bool,

    /// Reject triples without a confidence
    #[arg(long)]
    pub require_confidence: bool,
}

/// Arguments for the select command.
#[derive(Debug, Parser)]
pub struct SelectArgs {
    /// Decomposed document (page → paragraph JSON)
    #[arg(long, env = "PARAGRAPHS_JSON", default_value = "page_paragraphs.json")]
    pub paragraphs: PathBuf,

    /// Merged triples to select from
    #[arg(long, env = "MERGED", default_value = "triples_merged.json")]
    pub merged: PathBuf,

    /// Selected triples output
    #[arg(short, long, default_value = "triples_per_para.json")]
    pub out: PathBuf,

    /// Triples kept per paragraph
    #[arg(long, env = "PER_PAR_MAX")]
    pub per_par_max: Option<usize>,

    /// Paragraph snippet length attached to each triple
    #[arg(long, env = "CTX_MAX_CH")]
    pub ctx_max_ch: Option<usize>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
