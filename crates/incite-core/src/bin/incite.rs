//! incite command line interface
//!
//! `incite cite` resolves citekeys given on the command line; `incite
//! process` scans a content directory for citekeys and writes the resolved
//! bibliography alongside a failure report.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use incite_core::{
    load_manual_references, render, scan_citekeys, DiskCache, ManualReferences, MetadataCache,
    OutputFormat, Pipeline, PipelineConfig, PipelineError, RenderError, Resolution, RunStatus,
};

#[derive(Parser)]
#[command(name = "incite", version, about = "Resolve citekeys into CSL JSON bibliographies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve citekeys given as arguments and print CSL JSON
    Cite {
        /// Citekeys such as doi:10.1038/nature12373 or pmid:29424689
        #[arg(required = true)]
        citekeys: Vec<String>,

        /// Render a formatted bibliography through pandoc instead of
        /// printing CSL JSON
        #[arg(long)]
        render: bool,

        /// Path or URL of a CSL style file, passed to pandoc
        #[arg(long)]
        csl: Option<String>,

        /// Output format: plain, markdown, html, jats, or docx.
        /// Defaults to the output file extension, or plain
        #[arg(long)]
        format: Option<String>,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Cache directory for provider responses
        #[arg(long, default_value = "output/cache")]
        cache_dir: PathBuf,

        /// Pass retrieved metadata through without schema pruning
        #[arg(long)]
        allow_invalid_csl_data: bool,
    },
    /// Scan a content directory for citekeys and resolve them all
    Process {
        /// Directory holding markdown content and manual-references files
        #[arg(long, default_value = "content")]
        content_dir: PathBuf,

        /// Directory for references.json and failures.json
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Cache directory for provider responses
        #[arg(long, default_value = "output/cache")]
        cache_dir: PathBuf,

        /// Empty the cache before resolving
        #[arg(long)]
        clear_cache: bool,

        /// Pass retrieved metadata through without schema pruning
        #[arg(long)]
        lenient: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Cite {
            citekeys,
            render,
            csl,
            format,
            output,
            cache_dir,
            allow_invalid_csl_data,
        } => {
            cite(
                citekeys,
                render,
                csl.as_deref(),
                format.as_deref(),
                output.as_deref(),
                &cache_dir,
                !allow_invalid_csl_data,
            )
            .await
        }
        Commands::Process {
            content_dir,
            output_dir,
            cache_dir,
            clear_cache,
            lenient,
        } => process(&content_dir, &output_dir, &cache_dir, clear_cache, !lenient).await,
    };

    match result {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::Partial) => {
            tracing::warn!("some citekeys failed to resolve");
            ExitCode::from(1)
        }
        Ok(RunStatus::Failed) => {
            tracing::error!("no citekeys resolved");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(2)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{0}")]
    Usage(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

async fn cite(
    citekeys: Vec<String>,
    render_output: bool,
    csl: Option<&str>,
    format: Option<&str>,
    output: Option<&Path>,
    cache_dir: &Path,
    strict: bool,
) -> Result<RunStatus, CliError> {
    let resolution = resolve(&citekeys, &ManualReferences::empty(), cache_dir, strict).await?;

    if render_output {
        let format = output_format(format, output)?;
        render(&resolution.items, csl, format, output)?;
    } else {
        let json = serde_json::to_string_pretty(&resolution.items)?;
        match output {
            Some(path) => {
                std::fs::write(path, json).map_err(|source| CliError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            None => println!("{json}"),
        }
    }

    for failure in &resolution.failures {
        tracing::warn!(citekey = %failure.citekey, kind = %failure.kind, "{}", failure.message);
    }
    Ok(resolution.status())
}

async fn process(
    content_dir: &Path,
    output_dir: &Path,
    cache_dir: &Path,
    clear_cache: bool,
    strict: bool,
) -> Result<RunStatus, CliError> {
    let (manual, mut manual_failures) = load_manual_references(content_dir)?;
    let citekeys = scan_content(content_dir)?;
    tracing::info!(
        citekeys = citekeys.len(),
        manual = manual.len(),
        "resolving content directory"
    );

    if clear_cache {
        DiskCache::open(cache_dir).map_err(PipelineError::from)?.clear()
            .map_err(PipelineError::from)?;
    }

    let mut resolution = resolve(&citekeys, &manual, cache_dir, strict).await?;
    manual_failures.append(&mut resolution.failures);
    resolution.failures = manual_failures;

    std::fs::create_dir_all(output_dir).map_err(|source| CliError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    write_json(&output_dir.join("references.json"), &resolution.items)?;
    write_json(&output_dir.join("failures.json"), &resolution.failures)?;

    for failure in &resolution.failures {
        tracing::warn!(citekey = %failure.citekey, kind = %failure.kind, "{}", failure.message);
    }
    Ok(resolution.status())
}

async fn resolve(
    citekeys: &[String],
    manual: &ManualReferences,
    cache_dir: &Path,
    strict: bool,
) -> Result<Resolution, CliError> {
    let cache = Arc::new(DiskCache::open(cache_dir).map_err(PipelineError::from)?);
    let config = PipelineConfig {
        strict,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::standard(cache, config);
    Ok(pipeline.resolve(citekeys, manual).await?)
}

/// Collect citekeys from every markdown file under the content directory,
/// in path order, deduplicated by first appearance.
fn scan_content(content_dir: &Path) -> Result<Vec<String>, CliError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(content_dir)
        .map_err(|e| {
            PipelineError::ContentScope(format!(
                "cannot read content directory {}: {e}",
                content_dir.display()
            ))
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("md")
        })
        .collect();
    paths.sort();

    let mut citekeys = Vec::new();
    for path in &paths {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        for citekey in scan_citekeys(&text) {
            if !citekeys.contains(&citekey) {
                citekeys.push(citekey);
            }
        }
    }
    Ok(citekeys)
}

fn output_format(format: Option<&str>, output: Option<&Path>) -> Result<OutputFormat, CliError> {
    if let Some(name) = format {
        return name.parse().map_err(CliError::Usage);
    }
    if let Some(path) = output {
        if let Some(format) = OutputFormat::from_path(path) {
            return Ok(format);
        }
    }
    Ok(OutputFormat::Plain)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
