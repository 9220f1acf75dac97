//! Mem Render CLI - render JSON manifests through the in-memory renderer
//!
//! Commands: render, hash
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero on invalid input or render failure

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use manifest_render_mem::{
    builtin::{kind_filter, label_filter, set_labels},
    content_hash,
    input::load_sources,
    selector::by_name,
    with_content_hash, with_filters, with_source_annotations, with_source_selector,
    with_transformers, Filter, MemRenderer, RenderContext, RendererOption, Values,
};

#[derive(Parser)]
#[command(name = "mem-render")]
#[command(about = "Mem Render CLI - in-memory manifest renderer", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render source groups and print the resulting documents
    Render {
        /// JSON file with sources, a document array or a single document
        #[arg(short, long)]
        input: PathBuf,

        /// Keep only documents of this kind (repeatable)
        #[arg(short, long)]
        kind: Vec<String>,

        /// Keep only documents with this label, as key=value (repeatable,
        /// every label must match)
        #[arg(long, value_parser = parse_key_value)]
        label: Vec<(String, String)>,

        /// Set a label on every document, as key=value (repeatable)
        #[arg(long, value_parser = parse_key_value)]
        set_label: Vec<(String, String)>,

        /// Render only sources with this name (repeatable)
        #[arg(short, long)]
        select: Vec<String>,

        /// Add the source-type provenance annotation
        #[arg(long)]
        source_annotations: bool,

        /// Skip the content-hash annotation
        #[arg(long)]
        no_content_hash: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Print the content hash of every input document
    Hash {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

fn build_filters(kind: Vec<String>, label: Vec<(String, String)>) -> Vec<Filter> {
    let mut filters = Vec::new();
    if !kind.is_empty() {
        filters.push(kind_filter(kind));
    }
    filters.extend(label.into_iter().map(|(key, value)| label_filter(key, value)));
    filters
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if let Err(e) = installed {
        eprintln!("failed to install tracing subscriber: {e}");
    }
}

fn fail(error: impl std::fmt::Display) -> ExitCode {
    eprintln!("{}", json!({ "error": error.to_string() }));
    ExitCode::FAILURE
}

fn emit(value: &Value, pretty: bool) -> ExitCode {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Render {
            input,
            kind,
            label,
            set_label,
            select,
            source_annotations,
            no_content_hash,
            pretty,
        } => {
            let sources = match load_sources(&input) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };

            let mut options: Vec<RendererOption> = vec![
                with_filters(build_filters(kind, label)),
                with_source_annotations(source_annotations),
                with_content_hash(!no_content_hash),
            ];
            if !set_label.is_empty() {
                let labels: BTreeMap<String, String> = set_label.into_iter().collect();
                options.push(with_transformers([set_labels(labels)]));
            }
            if !select.is_empty() {
                options.push(with_source_selector(by_name(select)));
            }

            let renderer = match MemRenderer::new(sources, options) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };

            match renderer.process(&RenderContext::new(), &Values::new()) {
                Ok(docs) => {
                    let docs: Vec<Value> = docs.into_iter().map(|d| d.into_value()).collect();
                    emit(&Value::Array(docs), pretty)
                }
                Err(e) => fail(e),
            }
        }

        Commands::Hash { input } => {
            let sources = match load_sources(&input) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };

            let hashes: Vec<Value> = sources
                .iter()
                .flat_map(|source| {
                    source.objects().iter().map(move |doc| {
                        json!({
                            "source": source.name(),
                            "kind": doc.kind(),
                            "name": doc.name(),
                            "hash": content_hash(doc),
                        })
                    })
                })
                .collect();
            emit(&Value::Array(hashes), true)
        }
    }
}
