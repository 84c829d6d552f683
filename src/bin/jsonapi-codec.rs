//! JSON:API Codec CLI
//!
//! Command-line interface for linting, normalizing and paginating JSON:API documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use jsonapi_codec::{
    lint, page_links, read_json, render_links, JsonApiCodec, JsonApiConfiguration, LintResult,
    JsonApiDocument, PageMetadata, Severity, DEFAULT_PAGE_NUMBER_PARAMETER,
    DEFAULT_PAGE_SIZE_PARAMETER,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "jsonapi-codec")]
#[command(about = "Lint, normalize and paginate JSON:API documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint document files for errors (syntax, shape, relationships, links)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = LintFormat::Text)]
        format: LintFormat,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Parse a document and render it again with the configured policies
    Normalize {
        /// Document file
        file: PathBuf,

        /// Configuration file (camelCase JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the pagination links of a page
    PageLinks {
        /// Absolute base URL of the collection
        base: String,

        /// Zero based page number
        #[arg(long)]
        number: u64,

        /// Page size
        #[arg(long)]
        size: u64,

        /// Total number of elements in the collection
        #[arg(long)]
        total_elements: u64,

        /// Page number request parameter
        #[arg(long, default_value = DEFAULT_PAGE_NUMBER_PARAMETER)]
        number_param: String,

        /// Page size request parameter
        #[arg(long, default_value = DEFAULT_PAGE_SIZE_PARAMETER)]
        size_param: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LintFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, format, strict, quiet),

        Commands::Normalize {
            file,
            config,
            output,
            pretty,
        } => run_normalize(&file, config.as_deref(), output, pretty),

        Commands::PageLinks {
            base,
            number,
            size,
            total_elements,
            number_param,
            size_param,
        } => run_page_links(
            &base,
            PageMetadata::from_total(size, number, total_elements),
            &number_param,
            &size_param,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_lint(path: &Path, format: LintFormat, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    // `failed` already counts warnings under --strict.
    let result = lint(path, strict);
    match format {
        LintFormat::Json => {
            let json = serde_json::to_string_pretty(&result).map_err(|e| {
                eprintln!("Error serializing output: {}", e);
                2u8
            })?;
            println!("{}", json);
        }
        LintFormat::Text => print_lint_report(&result, quiet),
    }

    if result.failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}

/// One `file#pointer: severity[code]: message` line per diagnostic, then a summary.
fn print_lint_report(result: &LintResult, quiet: bool) {
    let diagnostics = result
        .results
        .iter()
        .flat_map(|file| &file.diagnostics)
        .filter(|d| !quiet || d.severity == Severity::Error);
    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!(
            "{}#{}: {}[{}]: {}",
            diagnostic.file.display(),
            diagnostic.path,
            severity,
            diagnostic.code,
            diagnostic.message
        );
    }

    let mut summary = format!("{} files checked", result.files_checked);
    if result.failed == 0 {
        summary.push_str(", all passed");
        if result.warnings > 0 && !quiet {
            summary.push_str(&format!(" ({} warnings)", result.warnings));
        }
    } else {
        summary.push_str(&format!(
            ", {} failed: {} errors, {} warnings",
            result.failed, result.errors, result.warnings
        ));
    }
    println!("{}", summary);
}

fn run_normalize(
    file: &Path,
    config_path: Option<&Path>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let config = match config_path {
        Some(path) => JsonApiConfiguration::load(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => JsonApiConfiguration::default(),
    };
    let codec = JsonApiCodec::new(config);

    let document = read_json(file)
        .and_then(|value| JsonApiDocument::from_value(&value))
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;

    let normalized = codec.normalize(document);
    for dropped in &normalized.dropped_links {
        eprintln!(
            "Dropped non-compliant {} link \"{}\": {}",
            dropped.scope, dropped.relation, dropped.href
        );
    }

    write_json(&codec.render(&normalized.document), output, pretty)
}

fn run_page_links(
    base: &str,
    page: PageMetadata,
    number_param: &str,
    size_param: &str,
) -> Result<(), u8> {
    let links = page_links(base, &page, number_param, size_param).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_json(
        &render_links(&links, &JsonApiConfiguration::default()),
        None,
        false,
    )
}

fn write_json(value: &Value, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}
